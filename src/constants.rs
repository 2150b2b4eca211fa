// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name used as field manager for creates and patches
pub const OPERATOR_NAME: &str = "backup-operator";

/// Shared per-namespace identity that the backup CronJobs run as
pub mod access {
    pub const SERVICE_ACCOUNT_NAME: &str = "cronjob-service-account";
    pub const ROLE_BINDING_NAME: &str = "cronjob-role-binding";
    /// Pre-provisioned cluster role, never created or altered by the operator
    pub const CLUSTER_ROLE_NAME: &str = "backup-operator-cronjob-role";
    pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
}

/// Shape of the derived CronJob
pub mod cronjob {
    pub const NAME_SUFFIX: &str = "-cronjob";
    pub const CONTAINER_NAME: &str = "backup";
    /// Pinned backup runner image, deliberately not configurable per Backup
    pub const IMAGE: &str =
        "inspirehep/cronjob-controller:e80b17085a5760b743f7d493152468437c82b513";
    pub const RESTART_POLICY: &str = "Never";
}

/// Labels put on derived objects
pub mod labels {
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    pub const BACKUP_NAME: &str = "inspirehep.net/backup";
}

/// Environment variables handed to the backup container
pub mod env {
    pub const SOURCE_TYPE: &str = "RCLONE_CONFIG_MEYRIN_TYPE";
    pub const SOURCE_PROVIDER: &str = "RCLONE_CONFIG_MEYRIN_PROVIDER";
    pub const SOURCE_ENDPOINT: &str = "RCLONE_CONFIG_MEYRIN_ENDPOINT";
    pub const DESTINATION_TYPE: &str = "RCLONE_CONFIG_S3_TYPE";
    pub const DESTINATION_PROVIDER: &str = "RCLONE_CONFIG_S3_PROVIDER";
    pub const DESTINATION_ENDPOINT: &str = "RCLONE_CONFIG_S3_ENDPOINT";
    pub const SOURCE_ACCESS_KEY: &str = "INVENIO_S3_ACCESS_KEY";
    pub const SOURCE_SECRET_KEY: &str = "INVENIO_S3_SECRET_KEY";
    pub const DESTINATION_ACCESS_KEY: &str = "RCLONE_CONFIG_S3_ACCESS_KEY_ID";
    pub const DESTINATION_SECRET_KEY: &str = "RCLONE_CONFIG_S3_SECRET_ACCESS_KEY";
    pub const BUCKET_LIST: &str = "BUCKET_LIST";
    pub const DRY_RUN: &str = "DRY_RUN";
    pub const NAMESPACE: &str = "NAMESPACE";
    pub const TOTAL_JOBS: &str = "TOTAL_JOBS";

    /// Every variable, in the order the container receives them
    pub const ALL: [&str; 14] = [
        SOURCE_TYPE,
        SOURCE_PROVIDER,
        SOURCE_ENDPOINT,
        DESTINATION_TYPE,
        DESTINATION_PROVIDER,
        DESTINATION_ENDPOINT,
        SOURCE_ACCESS_KEY,
        SOURCE_SECRET_KEY,
        DESTINATION_ACCESS_KEY,
        DESTINATION_SECRET_KEY,
        BUCKET_LIST,
        DRY_RUN,
        NAMESPACE,
        TOTAL_JOBS,
    ];
}

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "inspirehep.net";
    pub const VERSION: &str = "v1";
    pub const KIND: &str = "Backup";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
    /// Give up after this many discovery attempts
    pub const POLL_MAX_ATTEMPTS: u32 = 20;
}

//! Well-known condition names, reasons and messages.

/// Aggregate condition, True only when everything else is.
pub const READY: &str = "Ready";
/// Required secrets exist and carry the expected keys.
pub const INPUT_READY: &str = "InputReady";
/// TLS inputs (CA bundle) resolved and valid.
pub const TLS_INPUT_READY: &str = "TLSInputReady";
/// Service configuration materialized.
pub const SERVICE_CONFIG_READY: &str = "ServiceConfigReady";
/// Workload resource created and running.
pub const DEPLOYMENT_READY: &str = "DeploymentReady";
/// Network attachments present and reported by every pod.
pub const NETWORK_ATTACHMENTS_READY: &str = "NetworkAttachmentsReady";

/// Reasons used on conditions.
pub mod reasons {
    /// Condition holds
    pub const READY: &str = "Ready";
    /// Initial state, nothing evaluated yet
    pub const INIT: &str = "Init";
    /// Waiting for something that was requested
    pub const REQUESTED: &str = "Requested";
    /// Evaluation failed
    pub const ERROR: &str = "Error";
    /// Nothing was requested (e.g. zero replicas)
    pub const NOT_REQUESTED: &str = "NotRequested";
}

/// Messages used on conditions.
pub mod messages {
    /// Ready condition while starting
    pub const READY_INIT: &str = "Setup started";
    /// Ready condition once complete
    pub const READY: &str = "Setup complete";

    /// Input condition while starting
    pub const INPUT_READY_INIT: &str = "Input data not started";
    /// Input condition once complete
    pub const INPUT_READY: &str = "Input data complete";
    /// Input condition while a secret is missing
    pub const INPUT_READY_WAITING: &str = "Input data resources missing";

    /// Service config condition while starting
    pub const SERVICE_CONFIG_READY_INIT: &str = "Service config create not started";
    /// Service config condition once complete
    pub const SERVICE_CONFIG_READY: &str = "Service config create completed";

    /// Deployment condition while starting
    pub const DEPLOYMENT_READY_INIT: &str = "Deployment not started";
    /// Deployment condition while rolling out
    pub const DEPLOYMENT_READY_RUNNING: &str = "Deployment in progress";
    /// Deployment condition once complete
    pub const DEPLOYMENT_READY: &str = "Deployment completed";

    /// Network attachments condition while starting
    pub const NETWORK_ATTACHMENTS_READY_INIT: &str = "NetworkAttachments not started";
    /// Network attachments condition once complete
    pub const NETWORK_ATTACHMENTS_READY: &str = "NetworkAttachments completed";

    /// Generic initialisation message for names without a dedicated one
    pub const GENERIC_INIT: &str = "Not started";

    /// Input error message
    pub fn input_error(err: &str) -> String {
        format!("Input data error occurred {err}")
    }

    /// TLS input waiting message
    pub fn tls_input_waiting(secret: &str) -> String {
        format!("TLSInput is missing: {secret}")
    }

    /// TLS input error message
    pub fn tls_input_error(err: &str) -> String {
        format!("TLSInput error occurred in TLS sources {err}")
    }

    /// Service config waiting message
    pub fn service_config_waiting(missing: &str) -> String {
        format!("Service config create waiting for {missing}")
    }

    /// Service config error message
    pub fn service_config_error(err: &str) -> String {
        format!("Service config create error occurred {err}")
    }

    /// Deployment error message
    pub fn deployment_error(err: &str) -> String {
        format!("Deployment error occurred {err}")
    }

    /// Network attachment waiting message
    pub fn network_attachments_waiting(attachment: &str) -> String {
        format!("NetworkAttachment resources missing: {attachment}")
    }

    /// Network attachment error message
    pub fn network_attachments_error(err: &str) -> String {
        format!("NetworkAttachments error occurred {err}")
    }
}

/// Initialisation message for a condition name.
pub fn init_message(name: &str) -> &'static str {
    match name {
        READY => messages::READY_INIT,
        INPUT_READY | TLS_INPUT_READY => messages::INPUT_READY_INIT,
        SERVICE_CONFIG_READY => messages::SERVICE_CONFIG_READY_INIT,
        DEPLOYMENT_READY => messages::DEPLOYMENT_READY_INIT,
        NETWORK_ATTACHMENTS_READY => messages::NETWORK_ATTACHMENTS_READY_INIT,
        _ => messages::GENERIC_INIT,
    }
}

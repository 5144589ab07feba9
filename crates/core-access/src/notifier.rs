use crate::CoreAccessError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;
use tracing::info;

/// Delivers verification codes to users.
///
/// Real delivery (SMTP, SMS) lives outside this workspace; implementations only
/// need to hand the code to that channel.
#[async_trait]
pub trait OtpNotifier: Send + Sync + Debug + DynClone {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), CoreAccessError>;
}

dyn_clone::clone_trait_object!(OtpNotifier);

/// Writes the code to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl OtpNotifier for LogNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), CoreAccessError> {
        info!(%email, %code, "OTP issued (delivery stubbed)");
        Ok(())
    }
}

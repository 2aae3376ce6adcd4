use crate::domain::catalog::Category;
use crate::domain::ports::{Notifier, NotifyError};
use crate::domain::user::User;
use async_trait::async_trait;

/// Records payment notices on the log instead of delivering them.
///
/// Users without an email address are skipped, matching what a mail-backed
/// notifier would do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user: &User, category: &Category) -> Result<(), NotifyError> {
        let Some(email) = user.email.as_deref() else {
            tracing::debug!(user_id = user.id, "no email on file, skipping payment notice");
            return Ok(());
        };

        tracing::info!(
            user_id = user.id,
            to = email,
            category = %category.name,
            "payment notice sent"
        );
        Ok(())
    }
}

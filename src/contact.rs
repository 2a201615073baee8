// Contact email resolution for bookings: identity email, then the email
// remembered on this device, then asking the user

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::models::Identity;

// Device-local storage for the last email the user entered
pub trait DeviceEmailStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, email: &str);
}

// Asks the user for an email; `None` means they declined
pub trait EmailPrompt: Send + Sync {
    fn request_email(&self) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryEmailStore {
    email: Mutex<Option<String>>,
}

impl InMemoryEmailStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(email: &str) -> Self {
        Self {
            email: Mutex::new(Some(email.to_string())),
        }
    }
}

impl DeviceEmailStore for InMemoryEmailStore {
    fn load(&self) -> Option<String> {
        self.email.lock().clone()
    }

    fn save(&self, email: &str) {
        *self.email.lock() = Some(email.to_string());
    }
}

/// Keeps the email in a plain text file. I/O failures are logged and treated
/// as "nothing stored"; they never block a booking.
#[derive(Debug, Clone)]
pub struct FileEmailStore {
    path: PathBuf,
}

impl FileEmailStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceEmailStore for FileEmailStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read stored email");
                None
            }
        }
    }

    fn save(&self, email: &str) {
        if let Err(err) = fs::write(&self.path, email) {
            warn!(path = %self.path.display(), error = %err, "failed to persist email");
        }
    }
}

// For non-interactive callers
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl EmailPrompt for NoPrompt {
    fn request_email(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    Identity,
    Device,
    Prompt,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Picks the contact email for a booking. A prompted email is saved to the
/// device store so the next booking does not ask again. Returns `None` when
/// every source comes up empty.
pub fn resolve_contact_email(
    identity: &Identity,
    store: &dyn DeviceEmailStore,
    prompt: &dyn EmailPrompt,
) -> Option<(String, EmailSource)> {
    if let Some(email) = non_blank(identity.email.clone()) {
        return Some((email, EmailSource::Identity));
    }

    if let Some(email) = non_blank(store.load()) {
        debug!("using email stored on device");
        return Some((email, EmailSource::Device));
    }

    let email = non_blank(prompt.request_email())?;
    info!("persisting prompted contact email");
    store.save(&email);
    Some((email, EmailSource::Prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPrompt(Option<&'static str>);

    impl EmailPrompt for FixedPrompt {
        fn request_email(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn identity(email: Option<&str>) -> Identity {
        Identity {
            user_id: "u1".to_string(),
            email: email.map(str::to_string),
            first_name: Some("Asha".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_identity_email_wins() {
        let store = InMemoryEmailStore::with_email("device@example.com");
        let resolved = resolve_contact_email(
            &identity(Some("asha@example.com")),
            &store,
            &FixedPrompt(Some("prompt@example.com")),
        );
        assert_eq!(
            resolved,
            Some(("asha@example.com".to_string(), EmailSource::Identity))
        );
    }

    #[test]
    fn test_falls_back_to_device_email() {
        let store = InMemoryEmailStore::with_email("device@example.com");
        let resolved = resolve_contact_email(&identity(Some("  ")), &store, &NoPrompt);
        assert_eq!(
            resolved,
            Some(("device@example.com".to_string(), EmailSource::Device))
        );
    }

    #[test]
    fn test_prompted_email_is_persisted() {
        let store = InMemoryEmailStore::new();
        let resolved = resolve_contact_email(
            &identity(None),
            &store,
            &FixedPrompt(Some(" typed@example.com ")),
        );
        assert_eq!(
            resolved,
            Some(("typed@example.com".to_string(), EmailSource::Prompt))
        );
        assert_eq!(store.load().as_deref(), Some("typed@example.com"));
    }

    #[test]
    fn test_no_email_anywhere() {
        let store = InMemoryEmailStore::new();
        assert_eq!(
            resolve_contact_email(&identity(None), &store, &FixedPrompt(Some(""))),
            None
        );
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "storefront-email-{}.txt",
            rand::random::<u32>()
        ));
        let store = FileEmailStore::new(&path);
        assert_eq!(store.load(), None);

        store.save("file@example.com");
        assert_eq!(store.load().as_deref(), Some("file@example.com"));

        let _ = fs::remove_file(&path);
    }
}

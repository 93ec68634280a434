use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::{KeychainError, Result};

/// When a record may be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessProtection {
    /// Only while unlocked, and only if a passcode is set
    WhenPasscodeSetThisDeviceOnly,
    WhenUnlockedThisDeviceOnly,
    WhenUnlocked,
    /// After the first unlock following a restart
    #[default]
    AfterFirstUnlockThisDeviceOnly,
    AfterFirstUnlock,
}

impl AccessProtection {
    /// Whether records under this protection are bound to the current device
    pub fn is_this_device_only(&self) -> bool {
        matches!(
            self,
            AccessProtection::WhenPasscodeSetThisDeviceOnly
                | AccessProtection::WhenUnlockedThisDeviceOnly
                | AccessProtection::AfterFirstUnlockThisDeviceOnly
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessFlag {
    UserPresence,
    BiometryAny,
    BiometryCurrentSet,
    /// Set on private keys so they can be used for crypto operations
    PrivateKeyUsage,
}

impl AccessFlag {
    fn requires_user(&self) -> bool {
        !matches!(self, AccessFlag::PrivateKeyUsage)
    }
}

/// The user authentication a record demands before use
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authentication(BTreeSet<AccessFlag>);

impl Authentication {
    pub fn new(flags: impl IntoIterator<Item = AccessFlag>) -> Self {
        Self(flags.into_iter().collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn presence() -> Self {
        Self::new([AccessFlag::UserPresence])
    }

    pub fn biometric() -> Self {
        Self::new([AccessFlag::BiometryAny])
    }

    pub fn biometric_current() -> Self {
        Self::new([AccessFlag::BiometryCurrentSet])
    }

    pub fn contains(&self, flag: AccessFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn flags(&self) -> impl Iterator<Item = AccessFlag> + '_ {
        self.0.iter().copied()
    }

    pub fn requires_user(&self) -> bool {
        self.0.iter().any(AccessFlag::requires_user)
    }

    fn with(mut self, flag: AccessFlag) -> Self {
        self.0.insert(flag);
        self
    }

    fn without(mut self, flag: AccessFlag) -> Self {
        self.0.remove(&flag);
        self
    }
}

/// A resolved access policy, attached to every record and key we create
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessControl {
    protection: AccessProtection,
    flags: Authentication,
}

impl AccessControl {
    pub fn protection(&self) -> AccessProtection {
        self.protection
    }

    pub fn flags(&self) -> &Authentication {
        &self.flags
    }

    pub fn allows_private_key_usage(&self) -> bool {
        self.flags.contains(AccessFlag::PrivateKeyUsage)
    }
}

/// How records are written
///
/// # Examples
///
/// ```ignore
/// let options = Options {
///     authentication: Authentication::biometric(),
///     ..Options::default_encrypt_items()
/// };
/// keychain.save_string("secret", "token", None, Some(&options))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub access_protection: AccessProtection,
    pub authentication: Authentication,
    pub synchronizable: bool,
    pub invisible: bool,
    /// Transparently encrypt string, data and structured items
    pub encrypt_items: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            access_protection: AccessProtection::AfterFirstUnlockThisDeviceOnly,
            authentication: Authentication::none(),
            synchronizable: false,
            invisible: true,
            encrypt_items: false,
        }
    }
}

impl Options {
    pub fn default_encrypt_items() -> Self {
        Self {
            encrypt_items: true,
            ..Self::default()
        }
    }

    /// Resolve these options into an access policy
    ///
    /// Private keys always get `PrivateKeyUsage`, everything else never
    /// does.
    ///
    /// # Errors
    ///
    /// `KeychainError::UnableToCreateAccessControl` when user
    /// authentication is asked of a record that may leave the device, or
    /// when both biometry flags are set.
    pub fn access_control(&self, is_private_key: bool) -> Result<AccessControl> {
        let flags = if is_private_key {
            self.authentication.clone().with(AccessFlag::PrivateKeyUsage)
        } else {
            self.authentication.clone().without(AccessFlag::PrivateKeyUsage)
        };

        if flags.requires_user() && !self.access_protection.is_this_device_only() {
            return Err(KeychainError::UnableToCreateAccessControl(format!(
                "user authentication requires a this-device-only protection, got {:?}",
                self.access_protection
            )));
        }
        if flags.contains(AccessFlag::BiometryAny) && flags.contains(AccessFlag::BiometryCurrentSet)
        {
            return Err(KeychainError::UnableToCreateAccessControl(
                "biometry_any and biometry_current_set are mutually exclusive".to_string(),
            ));
        }

        Ok(AccessControl {
            protection: self.access_protection,
            flags,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(
            options.access_protection,
            AccessProtection::AfterFirstUnlockThisDeviceOnly
        );
        assert_eq!(options.authentication, Authentication::none());
        assert!(!options.synchronizable);
        assert!(options.invisible);
        assert!(!options.encrypt_items);

        let encrypted = Options::default_encrypt_items();
        assert!(encrypted.encrypt_items);
        assert_eq!(
            Options {
                encrypt_items: false,
                ..encrypted
            },
            options
        );
    }

    #[test]
    fn test_private_key_usage_flag() {
        let options = Options {
            authentication: Authentication::new([AccessFlag::PrivateKeyUsage]),
            ..Options::default()
        };
        assert!(options.access_control(true).unwrap().allows_private_key_usage());
        assert!(!options.access_control(false).unwrap().allows_private_key_usage());
    }

    #[test]
    fn test_presets_keep_protection() {
        let options = Options {
            access_protection: AccessProtection::WhenUnlockedThisDeviceOnly,
            authentication: Authentication::biometric_current(),
            ..Options::default()
        };
        let access = options.access_control(false).unwrap();
        assert_eq!(
            access.protection(),
            AccessProtection::WhenUnlockedThisDeviceOnly
        );
        assert!(access.flags().contains(AccessFlag::BiometryCurrentSet));
        assert!(access.flags().requires_user());
    }

    #[test]
    fn test_user_authentication_needs_this_device_only() {
        let options = Options {
            access_protection: AccessProtection::WhenUnlocked,
            authentication: Authentication::presence(),
            ..Options::default()
        };
        assert!(matches!(
            options.access_control(false),
            Err(KeychainError::UnableToCreateAccessControl(_))
        ));

        // private key usage alone is not user authentication
        let options = Options {
            access_protection: AccessProtection::AfterFirstUnlock,
            ..Options::default()
        };
        assert!(options.access_control(true).is_ok());
    }

    #[test]
    fn test_conflicting_biometry() {
        let options = Options {
            authentication: Authentication::new([
                AccessFlag::BiometryAny,
                AccessFlag::BiometryCurrentSet,
            ]),
            ..Options::default()
        };
        assert!(matches!(
            options.access_control(false),
            Err(KeychainError::UnableToCreateAccessControl(_))
        ));
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: Options = serde_json::from_str(r#"{"encrypt_items": true}"#).unwrap();
        assert_eq!(options, Options::default_encrypt_items());

        let options: Options =
            serde_json::from_str(r#"{"authentication": ["user_presence"]}"#).unwrap();
        assert_eq!(options.authentication, Authentication::presence());
    }
}

//! Binder Protocol Constants for ptx
//!
//! This crate defines:
//! - **Parcel markers** (interface token header, binder object types)
//! - **Reply exception codes** (the leading marker of every reply parcel)
//! - **Transport status codes** (returned by the driver, out-of-band)
//! - **Service names and interface tokens** (the operation catalogue key space)
//!
//! It is the **single source of truth** for wire constants, so the encoder,
//! the reply decoder and the mock transport never disagree about a value.
//!
//! # Reply Exception Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | No exception, payload follows |
//! | -1 | Security (authorization denied) |
//! | -2 .. -9 | Other remote exceptions |
//! | -127 | Noted app-ops reply header (skip, then read real code) |
//! | -128 | Strict-mode reply header (skip, then read real code) |
//! | -129 | Transaction failed |
//!
//! # Usage
//!
//! ```rust
//! use ptx_ipc::{descriptor, exception, op, service};
//!
//! let token = descriptor::VOICE_INTERACTION;
//! let name = service::VOICE_INTERACTION;
//! let operation = op::voice_interaction::UPDATE_STATE;
//! assert_eq!(exception::EX_SECURITY, -1);
//! # let _ = (token, name, operation);
//! ```

#![no_std]

// =============================================================================
// API Levels
// =============================================================================

/// Platform API levels with a known interface token layout.
pub mod api {
    /// Android 9 (Pie)
    pub const P: u32 = 28;
    /// Android 10
    pub const Q: u32 = 29;
    /// Android 11
    pub const R: u32 = 30;
    /// Android 12
    pub const S: u32 = 31;
    /// Android 12L
    pub const S_V2: u32 = 32;
    /// Android 13
    pub const TIRAMISU: u32 = 33;
    /// Android 14
    pub const UPSIDE_DOWN_CAKE: u32 = 34;
    /// Android 15
    pub const VANILLA_ICE_CREAM: u32 = 35;
    /// Android 16
    pub const BAKLAVA: u32 = 36;
}

// =============================================================================
// Parcel Markers
// =============================================================================

/// Interface token header values.
///
/// The header written before the interface token grew over releases:
/// - P: strict-mode policy only
/// - Q: + work-source uid
/// - R and later: + the `'SYST'` kernel header
pub mod parcel {
    /// Strict-mode "penalty gather" bit, always set in the policy word.
    pub const STRICT_MODE_PENALTY_GATHER: i32 = i32::MIN;

    /// Work source uid value meaning "not set" (Q and later).
    pub const WORK_SOURCE_UNSET: i32 = -1;

    /// `'SYST'` header written by system (non-vendor) parcels (R and later).
    pub const INTERFACE_HEADER_SYSTEM: i32 = 0x5359_5354;

    /// Length value written for an absent string or array.
    pub const NULL_LENGTH: i32 = -1;

    /// Presence flag preceding a non-null parcelable.
    pub const PARCELABLE_PRESENT: i32 = 1;

    /// Presence flag preceding a null parcelable.
    pub const PARCELABLE_ABSENT: i32 = 0;

    /// Kind tag written by the text-utils char sequence writer for plain text.
    pub const CHAR_SEQUENCE_PLAIN: i32 = 1;

    /// Type tag written before a string-backed URI.
    pub const URI_TYPE_STRING: i32 = 1;

    /// All parcel writes are padded to this alignment.
    pub const ALIGNMENT: usize = 4;
}

/// Flat binder object layout values.
pub mod binder {
    /// Local binder object (`'sb*'` + 0x85).
    pub const BINDER_TYPE_BINDER: u32 = 0x7362_2a85;
    /// Remote handle reference (`'sh*'` + 0x85).
    pub const BINDER_TYPE_HANDLE: u32 = 0x7368_2a85;
    /// Object accepts file descriptors.
    pub const FLAT_BINDER_FLAG_ACCEPTS_FDS: u32 = 0x100;
    /// Default minimum scheduling priority mask.
    pub const FLAT_BINDER_FLAG_PRIORITY_MASK: u32 = 0x7f;
    /// Size of a flat binder object on the wire.
    pub const FLAT_BINDER_OBJECT_SIZE: usize = 24;
    /// Stability word written after each object from R on.
    pub const STABILITY_UNDECLARED: i32 = 0;
}

/// Transaction codes and flags.
pub mod transaction {
    /// First user-defined transaction code.
    pub const FIRST_CALL_TRANSACTION: u32 = 0x0000_0001;
    /// Last user-defined transaction code.
    pub const LAST_CALL_TRANSACTION: u32 = 0x00ff_ffff;
    /// One-way call, no reply expected.
    pub const FLAG_ONEWAY: u32 = 0x0000_0001;
}

// =============================================================================
// Reply Exception Codes
// =============================================================================

/// Exception markers at the head of a reply parcel.
pub mod exception {
    pub const EX_NONE: i32 = 0;
    /// Caller lacks the permission the remote checked.
    pub const EX_SECURITY: i32 = -1;
    pub const EX_BAD_PARCELABLE: i32 = -2;
    pub const EX_ILLEGAL_ARGUMENT: i32 = -3;
    pub const EX_NULL_POINTER: i32 = -4;
    pub const EX_ILLEGAL_STATE: i32 = -5;
    pub const EX_NETWORK_MAIN_THREAD: i32 = -6;
    pub const EX_UNSUPPORTED_OPERATION: i32 = -7;
    /// Followed by a service-specific `i32` error code.
    pub const EX_SERVICE_SPECIFIC: i32 = -8;
    pub const EX_PARCELABLE: i32 = -9;
    /// Followed by a sized header to skip before the real code.
    pub const EX_HAS_NOTED_APPOPS_REPLY_HEADER: i32 = -127;
    /// Followed by a sized header to skip before the real code.
    pub const EX_HAS_STRICTMODE_REPLY_HEADER: i32 = -128;
    pub const EX_TRANSACTION_FAILED: i32 = -129;
}

/// Remote exception kinds decoded from a reply marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionCode {
    Security,
    BadParcelable,
    IllegalArgument,
    NullPointer,
    IllegalState,
    NetworkMainThread,
    UnsupportedOperation,
    ServiceSpecific,
    Parcelable,
    TransactionFailed,
}

impl ExceptionCode {
    /// Convert from the wire value.
    ///
    /// Returns `None` for `EX_NONE`, the reply-header markers and unknown values.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            exception::EX_SECURITY => Some(ExceptionCode::Security),
            exception::EX_BAD_PARCELABLE => Some(ExceptionCode::BadParcelable),
            exception::EX_ILLEGAL_ARGUMENT => Some(ExceptionCode::IllegalArgument),
            exception::EX_NULL_POINTER => Some(ExceptionCode::NullPointer),
            exception::EX_ILLEGAL_STATE => Some(ExceptionCode::IllegalState),
            exception::EX_NETWORK_MAIN_THREAD => Some(ExceptionCode::NetworkMainThread),
            exception::EX_UNSUPPORTED_OPERATION => Some(ExceptionCode::UnsupportedOperation),
            exception::EX_SERVICE_SPECIFIC => Some(ExceptionCode::ServiceSpecific),
            exception::EX_PARCELABLE => Some(ExceptionCode::Parcelable),
            exception::EX_TRANSACTION_FAILED => Some(ExceptionCode::TransactionFailed),
            _ => None,
        }
    }

    /// Wire value for this exception.
    pub fn as_i32(&self) -> i32 {
        match self {
            ExceptionCode::Security => exception::EX_SECURITY,
            ExceptionCode::BadParcelable => exception::EX_BAD_PARCELABLE,
            ExceptionCode::IllegalArgument => exception::EX_ILLEGAL_ARGUMENT,
            ExceptionCode::NullPointer => exception::EX_NULL_POINTER,
            ExceptionCode::IllegalState => exception::EX_ILLEGAL_STATE,
            ExceptionCode::NetworkMainThread => exception::EX_NETWORK_MAIN_THREAD,
            ExceptionCode::UnsupportedOperation => exception::EX_UNSUPPORTED_OPERATION,
            ExceptionCode::ServiceSpecific => exception::EX_SERVICE_SPECIFIC,
            ExceptionCode::Parcelable => exception::EX_PARCELABLE,
            ExceptionCode::TransactionFailed => exception::EX_TRANSACTION_FAILED,
        }
    }

    /// Get human-readable display name.
    pub fn name(&self) -> &'static str {
        match self {
            ExceptionCode::Security => "SecurityException",
            ExceptionCode::BadParcelable => "BadParcelableException",
            ExceptionCode::IllegalArgument => "IllegalArgumentException",
            ExceptionCode::NullPointer => "NullPointerException",
            ExceptionCode::IllegalState => "IllegalStateException",
            ExceptionCode::NetworkMainThread => "NetworkOnMainThreadException",
            ExceptionCode::UnsupportedOperation => "UnsupportedOperationException",
            ExceptionCode::ServiceSpecific => "ServiceSpecificException",
            ExceptionCode::Parcelable => "ParcelableException",
            ExceptionCode::TransactionFailed => "TransactionFailedException",
        }
    }

    /// Whether the remote rejected the caller for lacking authorization.
    pub fn is_security(&self) -> bool {
        matches!(self, ExceptionCode::Security)
    }
}

// =============================================================================
// Transport Status Codes
// =============================================================================

/// Driver-level status values returned by a transact (out-of-band of the reply).
pub mod status {
    pub const OK: i32 = 0;
    pub const UNKNOWN_ERROR: i32 = i32::MIN;
    pub const NO_MEMORY: i32 = -12;
    pub const INVALID_OPERATION: i32 = -38;
    pub const BAD_VALUE: i32 = -22;
    pub const BAD_TYPE: i32 = UNKNOWN_ERROR + 1;
    pub const NAME_NOT_FOUND: i32 = -2;
    pub const PERMISSION_DENIED: i32 = -1;
    pub const NO_INIT: i32 = -19;
    pub const DEAD_OBJECT: i32 = -32;
    pub const FAILED_TRANSACTION: i32 = UNKNOWN_ERROR + 2;
    pub const UNKNOWN_TRANSACTION: i32 = -74;
    pub const TIMED_OUT: i32 = -110;
}

// =============================================================================
// Service Names
// =============================================================================

/// Service manager names for the catalogued system services.
pub mod service {
    pub const ACTIVITY: &str = "activity";
    pub const CAMERA: &str = "media.camera";
    pub const DEVICE_POLICY: &str = "device_policy";
    pub const FINGERPRINT: &str = "fingerprint";
    pub const LOCK_SETTINGS: &str = "lock_settings";
    pub const PACKAGE: &str = "package";
    pub const POWER: &str = "power";
    pub const SENSOR_PRIVACY: &str = "sensor_privacy";
    pub const STATUS_BAR: &str = "statusbar";
    pub const SURFACE_FLINGER: &str = "SurfaceFlinger";
    pub const TELEPHONY: &str = "phone";
    pub const URI_GRANTS: &str = "uri_grants";
    pub const VOICE_INTERACTION: &str = "voiceinteraction";
    pub const WIFI: &str = "wifi";
}

// =============================================================================
// Interface Tokens
// =============================================================================

/// Interface tokens (descriptors) written as the authentication header.
///
/// Stable across releases, unlike the operation ids behind them.
pub mod descriptor {
    pub const ACTIVITY: &str = "android.app.IActivityManager";
    pub const CAMERA: &str = "android.hardware.ICameraService";
    pub const DEVICE_POLICY: &str = "android.app.admin.IDevicePolicyManager";
    pub const FINGERPRINT: &str = "android.hardware.fingerprint.IFingerprintService";
    pub const LOCK_SETTINGS: &str = "com.android.internal.widget.ILockSettings";
    pub const PACKAGE: &str = "android.content.pm.IPackageManager";
    pub const POWER: &str = "android.os.IPowerManager";
    pub const SENSOR_PRIVACY: &str = "android.hardware.ISensorPrivacyManager";
    pub const STATUS_BAR: &str = "com.android.internal.statusbar.IStatusBarService";
    pub const SURFACE_FLINGER: &str = "android.ui.ISurfaceComposer";
    pub const TELEPHONY: &str = "com.android.internal.telephony.ITelephony";
    pub const URI_GRANTS: &str = "android.app.IUriGrantsManager";
    pub const VOICE_INTERACTION: &str = "com.android.internal.app.IVoiceInteractionManagerService";
    pub const WIFI: &str = "android.net.wifi.IWifiManager";
}

// =============================================================================
// Operation Catalogue
// =============================================================================

/// Operation names, grouped by the interface that declares them.
///
/// Names are stable across releases; the id each maps to is not.
pub mod op {
    pub mod voice_interaction {
        pub const UPDATE_STATE: &str = "updateState";
        pub const GET_ACTIVE_SERVICE_COMPONENT_NAME: &str = "getActiveServiceComponentName";
        pub const UPDATE_KEYPHRASE_SOUND_MODEL: &str = "updateKeyphraseSoundModel";
        pub const IS_SESSION_RUNNING: &str = "isSessionRunning";
    }

    pub mod fingerprint {
        pub const RESET_TIMEOUT: &str = "resetTimeout";
        pub const RESET_LOCKOUT: &str = "resetLockout";
        pub const CANCEL_ENROLLMENT: &str = "cancelEnrollment";
        pub const CANCEL_AUTHENTICATION_FROM_SERVICE: &str = "cancelAuthenticationFromService";
    }

    pub mod power {
        pub const REBOOT: &str = "reboot";
        pub const SET_POWER_SAVE_MODE: &str = "setPowerSaveMode";
        pub const SET_DYNAMIC_POWER_SAVE_HINT: &str = "setDynamicPowerSaveHint";
        pub const SET_BATTERY_DISCHARGE_PREDICTION: &str = "setBatteryDischargePrediction";
    }

    pub mod camera {
        pub const NOTIFY_SYSTEM_EVENT: &str = "notifySystemEvent";
        pub const INJECT_CAMERA: &str = "injectCamera";
    }

    pub mod uri_grants {
        pub const TAKE_PERSISTABLE_URI_PERMISSION: &str = "takePersistableUriPermission";
        pub const GET_GRANTED_URI_PERMISSIONS: &str = "getGrantedUriPermissions";
    }

    pub mod lock_settings {
        pub const VERIFY_CREDENTIAL: &str = "verifyCredential";
    }

    pub mod surface_flinger {
        pub const BOOT_FINISHED: &str = "bootFinished";
        pub const SHOW_CPU: &str = "showCpu";
    }

    pub mod status_bar {
        pub const ON_BIOMETRIC_HELP: &str = "onBiometricHelp";
        pub const HIDE_BIOMETRIC_DIALOG: &str = "hideBiometricDialog";
    }

    pub mod activity {
        pub const UNHANDLED_BACK: &str = "unhandledBack";
        pub const SET_ALWAYS_FINISH: &str = "setAlwaysFinish";
        pub const SET_PROCESS_LIMIT: &str = "setProcessLimit";
        pub const SHUTDOWN: &str = "shutdown";
        pub const REQUEST_BUG_REPORT: &str = "requestBugReport";
        pub const RESUME_APP_SWITCHES: &str = "resumeAppSwitches";
        pub const GET_INTENT_FOR_INTENT_SENDER: &str = "getIntentForIntentSender";
        pub const RESET_APP_ERRORS: &str = "resetAppErrors";
    }

    pub mod wifi {
        pub const SET_WIFI_ENABLED: &str = "setWifiEnabled";
        pub const STOP_SOFT_AP: &str = "stopSoftAp";
        pub const GET_WIFI_AP_CONFIGURATION: &str = "getWifiApConfiguration";
        pub const SET_OVERRIDE_COUNTRY_CODE: &str = "setOverrideCountryCode";
        pub const RESTART_WIFI_SUBSYSTEM: &str = "restartWifiSubsystem";
    }

    pub mod package {
        pub const MOVE_PACKAGE: &str = "movePackage";
        pub const GET_MOVE_STATUS: &str = "getMoveStatus";
        pub const GET_RUNTIME_PERMISSIONS_VERSION: &str = "getRuntimePermissionsVersion";
        pub const IS_PACKAGE_STATE_PROTECTED: &str = "isPackageStateProtected";
        pub const SET_KEEP_UNINSTALLED_PACKAGES: &str = "setKeepUninstalledPackages";
    }

    pub mod device_policy {
        pub const SET_DEVICE_OWNER: &str = "setDeviceOwner";
        pub const INSTALL_CA_CERT: &str = "installCaCert";
        pub const FORCE_SECURITY_LOGS: &str = "forceSecurityLogs";
    }

    pub mod telephony {
        pub const ENABLE_LOCATION_UPDATES: &str = "enableLocationUpdates";
        pub const GET_VT_DATA_USAGE: &str = "getVtDataUsage";
    }

    pub mod sensor_privacy {
        pub const SET_SENSOR_PRIVACY: &str = "setSensorPrivacy";
        pub const IS_SENSOR_PRIVACY_ENABLED: &str = "isSensorPrivacyEnabled";
    }
}

/// Catalogued (interface token, service name) pairs.
///
/// Lets callers that only know the token find the default service to call.
pub const CATALOGUE: &[(&str, &str)] = &[
    (descriptor::ACTIVITY, service::ACTIVITY),
    (descriptor::CAMERA, service::CAMERA),
    (descriptor::DEVICE_POLICY, service::DEVICE_POLICY),
    (descriptor::FINGERPRINT, service::FINGERPRINT),
    (descriptor::LOCK_SETTINGS, service::LOCK_SETTINGS),
    (descriptor::PACKAGE, service::PACKAGE),
    (descriptor::POWER, service::POWER),
    (descriptor::SENSOR_PRIVACY, service::SENSOR_PRIVACY),
    (descriptor::STATUS_BAR, service::STATUS_BAR),
    (descriptor::SURFACE_FLINGER, service::SURFACE_FLINGER),
    (descriptor::TELEPHONY, service::TELEPHONY),
    (descriptor::URI_GRANTS, service::URI_GRANTS),
    (descriptor::VOICE_INTERACTION, service::VOICE_INTERACTION),
    (descriptor::WIFI, service::WIFI),
];

/// Default service name for an interface token, if catalogued.
pub fn service_for_descriptor(token: &str) -> Option<&'static str> {
    CATALOGUE
        .iter()
        .find(|(descriptor, _)| *descriptor == token)
        .map(|(_, service)| *service)
}

//! Properties that must hold for every built-in table
//!
//! These walk the shipped tables instead of single hand-picked entries.

use std::sync::Arc;

use ptx_hal_mock::MockTransport;
use ptx_ipc::{descriptor, exception, op, service};
use ptx_transact::parcel::{Account, ComponentName};
use ptx_transact::registry::builtin_levels;
use ptx_transact::{
    encode, Arg, ApiLevel, InvocationResult, InvokeError, Parcel, RegistrySet, Target, TextMode,
    TransactConfig, TransactContext, Transport,
};

fn context(level: ApiLevel) -> (Arc<MockTransport>, TransactContext) {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock.clone();
    let context = TransactContext::new(&TransactConfig::for_level(level), transport).unwrap();
    (mock, context)
}

#[test]
fn test_lookup_is_deterministic_for_every_entry() {
    let tables = RegistrySet::builtin().unwrap();
    for level in tables.levels() {
        let table = tables.select(level).unwrap();
        for interface in table.interfaces() {
            let operations = table.operations(interface.as_str()).unwrap();
            for (name, id) in operations {
                let first = table.lookup(interface.as_str(), name.as_str()).unwrap();
                let second = table.lookup(interface.as_str(), name.as_str()).unwrap();
                assert_eq!(first, *id);
                assert_eq!(first, second);
            }
        }
    }
}

#[test]
fn test_selection_without_table_always_fails() {
    let tables = RegistrySet::builtin().unwrap();
    let shipped: Vec<ApiLevel> = builtin_levels().collect();

    for level in [0, 1, 21, 27, 32, 33, 34, 35, 36, 1000] {
        let level = ApiLevel(level);
        assert!(!shipped.contains(&level));
        let err = tables.select(level).unwrap_err();
        assert!(err.is_unsupported_version(), "level {} gave {:?}", level, err);
    }
}

#[test]
fn test_absent_operation_sends_nothing() {
    // updateState does not exist before S
    let (mock, ctx) = context(ApiLevel::P);
    mock.add_service(service::VOICE_INTERACTION);

    let result = ctx.invoker().call(
        descriptor::VOICE_INTERACTION,
        op::voice_interaction::UPDATE_STATE,
        &Target::service(service::VOICE_INTERACTION),
        &[Arg::text("state")],
    );

    match result {
        InvocationResult::UnsupportedOnVersion {
            interface,
            operation,
            api_level,
        } => {
            assert_eq!(interface, descriptor::VOICE_INTERACTION);
            assert_eq!(operation, "updateState");
            assert_eq!(api_level, ApiLevel::P);
        }
        other => panic!("Expected UnsupportedOnVersion, got {:?}", other),
    }
    assert_eq!(mock.transaction_count(), 0);
}

#[test]
fn test_absent_operation_is_skipped_not_failed() {
    for level in [ApiLevel::P, ApiLevel::Q, ApiLevel::R] {
        let (mock, ctx) = context(level);
        mock.add_service(service::VOICE_INTERACTION);

        let err = ctx
            .invoker()
            .call(
                descriptor::VOICE_INTERACTION,
                op::voice_interaction::UPDATE_STATE,
                &Target::service(service::VOICE_INTERACTION),
                &[Arg::text("state")],
            )
            .into_result()
            .unwrap_err();

        assert!(err.is_skip(), "level {} gave {:?}", level, err);
        assert!(err.is_bypass());
        assert!(!matches!(err, InvokeError::UnexpectedInvocationFailure { .. }));
        assert_eq!(mock.transaction_count(), 0);
    }
}

#[test]
fn test_encoding_is_deterministic() {
    let args = || {
        vec![
            Arg::text("com.example"),
            Arg::Int(-7),
            Arg::Long(1 << 40),
            Arg::Bool(true),
            Arg::IntArray(Some(vec![1, 2, 3])),
            Arg::Bytes(Some(vec![0xde, 0xad, 0xbe])),
            Arg::null_binder(),
            Arg::parcelable(ComponentName::new("com.example", "com.example.Svc")),
            Arg::parcelable(Account::new("user@example.com", "com.example")),
            Arg::text_array(["a", "b"]),
        ]
    };

    for level in builtin_levels() {
        for mode in [TextMode::String16, TextMode::CharSequence] {
            let first = encode(descriptor::ACTIVITY, level, &args(), mode);
            let second = encode(descriptor::ACTIVITY, level, &args(), mode);
            assert_eq!(first.as_bytes(), second.as_bytes());
            assert_eq!(first.object_offsets(), second.object_offsets());
        }
    }
}

#[test]
fn test_repeated_calls_classify_the_same() {
    let (mock, ctx) = context(ApiLevel::S);
    let power = mock.add_service(service::POWER);
    let wifi = mock.add_service(service::WIFI);

    let mut denied = Parcel::new();
    denied.write_i32(exception::EX_SECURITY);
    denied.write_string16(Some("REBOOT permission required"));
    denied.write_i32(0);
    mock.script_reply(power, 30, denied.into_bytes());

    let calls = [
        (descriptor::POWER, op::power::REBOOT, service::POWER),
        (descriptor::WIFI, op::wifi::RESTART_WIFI_SUBSYSTEM, service::WIFI),
        (descriptor::CAMERA, op::camera::NOTIFY_SYSTEM_EVENT, service::CAMERA),
        (descriptor::POWER, "noSuchOperation", service::POWER),
    ];

    for (interface, operation, name) in calls {
        let run = || {
            ctx.invoker()
                .call(interface, operation, &Target::service(name), &[Arg::Int(0)])
                .label()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second, "{}.{} flipped", interface, operation);
    }

    assert!(mock.transactions().iter().all(|t| t.handle == power || t.handle == wifi));
}

#[test]
fn test_registry_dir_overrides_builtin_level() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("binderdb-31.json"),
        r#"{
            "services": { "POWER_SERVICE": "power" },
            "methods": { "android.os.IPowerManager": { "reboot": 99 } }
        }"#,
    )
    .unwrap();

    let mut config = TransactConfig::for_level(ApiLevel::S);
    config.registry_dir = Some(dir.path().to_path_buf());

    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    let ctx = TransactContext::new(&config, transport).unwrap();
    assert_eq!(ctx.registry().lookup(descriptor::POWER, "reboot").unwrap().code(), 99);
    assert!(!ctx.registry().contains(descriptor::VOICE_INTERACTION, "updateState"));

    // Other levels keep their built-in tables
    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    config.api_level = ApiLevel::P;
    let ctx = TransactContext::new(&config, transport).unwrap();
    assert_eq!(ctx.registry().lookup(descriptor::POWER, "reboot").unwrap().code(), 18);
}

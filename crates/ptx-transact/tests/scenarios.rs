//! End-to-end invocation scenarios
//!
//! Drives `TransactContext` against `MockTransport` the way a permission
//! test case would: select a table, call an operation, check the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ptx_hal_mock::{BindBehavior, MockTransport};
use ptx_ipc::{descriptor, exception, op, service};
use ptx_transact::parcel::ComponentName;
use ptx_transact::{
    Arg, ApiLevel, CallOptions, ConnectionRequest, ContextError, FailureCause, InvocationResult,
    LocatorError, Parcel, RegistryError, RegistrySet, Target, TransactConfig, TransactContext,
    Transport,
};

fn context(level: ApiLevel) -> (Arc<MockTransport>, TransactContext) {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock.clone();
    let context = TransactContext::new(&TransactConfig::for_level(level), transport).unwrap();
    (mock, context)
}

fn security_exception(message: &str) -> Vec<u8> {
    let mut reply = Parcel::new();
    reply.write_i32(exception::EX_SECURITY);
    reply.write_string16(Some(message));
    reply.write_i32(0);
    reply.into_bytes()
}

/// Level 31 maps VoiceInteraction.updateState to 33; a level with no table is a configuration error
#[test]
fn test_scenario_a_version_selection() {
    let (_mock, ctx) = context(ApiLevel::S);
    let id = ctx
        .registry()
        .lookup(descriptor::VOICE_INTERACTION, op::voice_interaction::UPDATE_STATE)
        .unwrap();
    assert_eq!(id.code(), 33);

    // A set holding only level 31: selecting 30 must fail, not fall back
    let mut tables = RegistrySet::new();
    tables
        .insert((*RegistrySet::builtin().unwrap().select(ApiLevel::S).unwrap()).clone())
        .unwrap();
    let err = tables.select(ApiLevel::R).unwrap_err();
    assert!(err.is_unsupported_version());

    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    let err = TransactContext::from_tables(
        &tables,
        ApiLevel::R,
        transport,
        Duration::from_millis(5000),
        CallOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ContextError::Registry(RegistryError::UnsupportedVersion { api_level: 30, .. })
    ));
}

/// A security exception in the reply keeps its message and is not reported as a generic failure
#[test]
fn test_scenario_b_authorization_denied() {
    let (mock, ctx) = context(ApiLevel::S);
    let handle = mock.add_service(service::VOICE_INTERACTION);
    let message = "Caller does not hold android.permission.MANAGE_VOICE_KEYPHRASES";
    mock.script_reply(handle, 14, security_exception(message));

    let result = ctx.invoker().call(
        descriptor::VOICE_INTERACTION,
        op::voice_interaction::UPDATE_KEYPHRASE_SOUND_MODEL,
        &Target::service("VOICE_INTERACTION_SERVICE"),
        &[Arg::Bytes(None)],
    );

    match &result {
        InvocationResult::AuthorizationDenied(cause) => {
            assert_eq!(cause.message.as_deref(), Some(message));
        }
        other => panic!("Expected AuthorizationDenied, got {:?}", other),
    }

    let err = result.into_result().unwrap_err();
    assert!(err.is_authorization_denied());
    assert!(err.to_string().contains(message));
}

/// Bind-and-wait against a target that never connects gives up after the timeout
#[test]
fn test_scenario_c_connect_timeout() {
    let (mock, ctx) = context(ApiLevel::S);
    let request = ConnectionRequest::component("com.example.victim", "com.example.victim.Svc");
    mock.set_bind_behavior(&request.target_key(), BindBehavior::Never);

    let timeout = Duration::from_millis(1000);
    let start = Instant::now();
    let err = ctx.locator().resolve_by_intent(&request, timeout).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "got {:?}", err);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout * 5, "waited {:?}", elapsed);
    assert_eq!(mock.active_binding_count(), 0);
    assert_eq!(mock.unbind_count(), 1);
}

/// Connect timeouts surface from the invoker as transport failures
#[test]
fn test_scenario_c_timeout_through_invoker() {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock.clone();
    let mut config = TransactConfig::for_level(ApiLevel::S);
    config.bind_timeout_ms = 50;
    let ctx = TransactContext::new(&config, transport).unwrap();

    let request = ConnectionRequest::component("com.example", "com.example.Never");
    mock.set_bind_behavior(&request.target_key(), BindBehavior::Never);

    let result = ctx.invoker().call(
        descriptor::POWER,
        op::power::REBOOT,
        &Target::Intent(request),
        &[Arg::Bool(false), Arg::text("test"), Arg::Bool(false)],
    );
    assert!(matches!(
        result,
        InvocationResult::TransportFailure(FailureCause::ConnectTimeout { timeout_ms: 50, .. })
    ));
    assert_eq!(mock.transaction_count(), 0);
}

/// A service absent on this build is reported as unavailable
#[test]
fn test_scenario_d_service_unavailable() {
    let (mock, ctx) = context(ApiLevel::S);

    let err = ctx.locator().resolve_by_name(service::SENSOR_PRIVACY).unwrap_err();
    assert!(matches!(err, LocatorError::ServiceUnavailable { ref service } if service == "sensor_privacy"));

    let result = ctx.invoker().call(
        descriptor::SENSOR_PRIVACY,
        op::sensor_privacy::SET_SENSOR_PRIVACY,
        &Target::service(service::SENSOR_PRIVACY),
        &[Arg::Bool(true)],
    );
    assert!(result.is_service_unavailable());
    assert!(result.into_result().unwrap_err().is_bypass());
    assert_eq!(mock.transaction_count(), 0);
}

/// Bound targets deliver to the callback thread and are released after the call
#[test]
fn test_bound_call_releases_connection() {
    let (mock, ctx) = context(ApiLevel::S);
    let handle = mock.allocate_handle();
    let request = ConnectionRequest::component("com.example", "com.example.Bound");
    mock.set_bind_behavior(
        &request.target_key(),
        BindBehavior::Delayed(handle, Duration::from_millis(20)),
    );

    let result = ctx.invoker().call(
        descriptor::VOICE_INTERACTION,
        op::voice_interaction::IS_SESSION_RUNNING,
        &Target::Intent(request),
        &[],
    );
    assert!(result.is_success());
    assert_eq!(mock.last_transaction().unwrap().handle, handle);
    assert_eq!(mock.active_binding_count(), 0);
}

/// CharSequence text and composite arguments reach the transport in order
#[test]
fn test_char_sequence_call_payload() {
    let (mock, ctx) = context(ApiLevel::S);
    let handle = mock.add_service(service::STATUS_BAR);

    let result = ctx.invoker().call_char_sequence(
        descriptor::STATUS_BAR,
        op::status_bar::ON_BIOMETRIC_HELP,
        &Target::service(service::STATUS_BAR),
        &[Arg::Int(0), Arg::text("help")],
    );
    assert!(result.is_success());

    let sent = mock.last_transaction().unwrap();
    assert_eq!(sent.handle, handle);
    let expected = ptx_transact::encode(
        descriptor::STATUS_BAR,
        ApiLevel::S,
        &[Arg::Int(0), Arg::text("help")],
        ptx_transact::TextMode::CharSequence,
    );
    assert_eq!(sent.data, expected.as_bytes());
}

/// Parcelable arguments are written with their presence flag
#[test]
fn test_parcelable_argument_call() {
    let (mock, ctx) = context(ApiLevel::R);
    let handle = mock.add_service(service::DEVICE_POLICY);

    let result = ctx.invoker().call(
        descriptor::DEVICE_POLICY,
        op::device_policy::SET_DEVICE_OWNER,
        &Target::service("DEVICE_POLICY_SERVICE"),
        &[
            Arg::parcelable(ComponentName::new("com.example", "com.example.Admin")),
            Arg::text("owner"),
            Arg::Int(0),
        ],
    );
    assert!(result.is_success());

    let sent = mock.last_transaction().unwrap();
    assert_eq!(sent.handle, handle);
    assert_eq!(sent.code, 70);
    // 'SYST' header + token, then the presence flag
    let mut prefix = Parcel::new();
    prefix.write_interface_token(descriptor::DEVICE_POLICY, ApiLevel::R);
    prefix.write_i32(1);
    assert!(sent.data.starts_with(prefix.as_bytes()));
}

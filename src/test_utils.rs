/*
 * Test utilities and fakes for fphal
 *
 * This module provides in-memory stand-ins for the vendor driver, the UDFPS
 * plugin and the client callback, plus a log capture helper, shared by the
 * unit tests of every module.
 */

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use fp_error::{FingerprintError, Result};
use fp_protocol::{AcquiredInfo, ErrorCode};
use parking_lot::Mutex;

use crate::config::{FingerprintConfig, KEY_TYPE};
use crate::driver::{
    DeviceKey, DriverError, FingerprintDevice, FingerprintMsg, HwModule, ModuleLoader, NotifyFn, STATUS_OK,
};
use crate::resolver::DEFAULT_MODULE_ID;
use crate::session::{DeathRecipient, SessionCallback};
use crate::udfps::{UdfpsHandler, UdfpsHandlerFactory};

/// Creates a default config with the given sensor `type`
pub fn config_with_type(sensor_type: &str) -> Arc<FingerprintConfig> {
    let config = FingerprintConfig::new();
    // Any string is accepted for a string key
    let _ = config.set(KEY_TYPE, sensor_type);
    Arc::new(config)
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns everything it logged
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// Driver fakes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    PreEnroll,
    Enroll(Vec<u8>, u32, u32),
    PostEnroll,
    GetAuthenticatorId,
    Cancel,
    Enumerate,
    Remove(u32, u32),
    SetActiveGroup(u32, String),
    Authenticate(u64, u32),
}

/// Fingerprint device that records every call
pub struct FakeDevice {
    key: Mutex<Option<DeviceKey>>,
    notify: Mutex<Option<NotifyFn>>,
    notify_status: Mutex<i32>,
    close_status: Mutex<i32>,
    close_calls: Mutex<u32>,
    op_status: Mutex<i32>,
    authenticator_id: Mutex<u64>,
    calls: Mutex<Vec<DeviceCall>>,
    emit_on_set_active_group: Mutex<Option<FingerprintMsg>>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            key: Mutex::new(None),
            notify: Mutex::new(None),
            notify_status: Mutex::new(STATUS_OK),
            close_status: Mutex::new(STATUS_OK),
            close_calls: Mutex::new(0),
            op_status: Mutex::new(STATUS_OK),
            authenticator_id: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            emit_on_set_active_group: Mutex::new(None),
        })
    }

    pub fn key(&self) -> Option<DeviceKey> {
        *self.key.lock()
    }

    pub fn set_close_status(&self, status: i32) {
        *self.close_status.lock() = status;
    }

    pub fn set_notify_status(&self, status: i32) {
        *self.notify_status.lock() = status;
    }

    /// Status returned by every status-returning operation
    pub fn set_op_status(&self, status: i32) {
        *self.op_status.lock() = status;
    }

    pub fn set_authenticator_id(&self, id: u64) {
        *self.authenticator_id.lock() = id;
    }

    pub fn close_calls(&self) -> u32 {
        *self.close_calls.lock()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make `set_active_group` deliver `msg` before it returns
    pub fn emit_during_set_active_group(&self, msg: FingerprintMsg) {
        *self.emit_on_set_active_group.lock() = Some(msg);
    }

    /// Deliver `msg` the way the vendor driver would
    pub fn emit(&self, msg: &FingerprintMsg) {
        let notify = *self.notify.lock();
        if let (Some(notify), Some(key)) = (notify, self.key()) {
            notify(key, msg);
        }
    }

    fn record(&self, call: DeviceCall) -> i32 {
        self.calls.lock().push(call);
        *self.op_status.lock()
    }
}

impl FingerprintDevice for FakeDevice {
    fn set_notify(&self, notify: NotifyFn) -> i32 {
        let status = *self.notify_status.lock();
        if status == STATUS_OK {
            *self.notify.lock() = Some(notify);
        }
        status
    }

    fn close(&self) -> i32 {
        *self.close_calls.lock() += 1;
        *self.close_status.lock()
    }

    fn pre_enroll(&self) -> u64 {
        self.record(DeviceCall::PreEnroll);
        0xfeed
    }

    fn enroll(&self, hat: &[u8], group_id: u32, timeout_sec: u32) -> i32 {
        self.record(DeviceCall::Enroll(hat.to_vec(), group_id, timeout_sec))
    }

    fn post_enroll(&self) -> i32 {
        self.record(DeviceCall::PostEnroll)
    }

    fn get_authenticator_id(&self) -> u64 {
        self.record(DeviceCall::GetAuthenticatorId);
        *self.authenticator_id.lock()
    }

    fn cancel(&self) -> i32 {
        self.record(DeviceCall::Cancel)
    }

    fn enumerate(&self) -> i32 {
        self.record(DeviceCall::Enumerate)
    }

    fn remove(&self, group_id: u32, finger_id: u32) -> i32 {
        self.record(DeviceCall::Remove(group_id, finger_id))
    }

    fn set_active_group(&self, group_id: u32, store_path: &str) -> i32 {
        let status = self.record(DeviceCall::SetActiveGroup(group_id, store_path.to_string()));
        let pending = self.emit_on_set_active_group.lock().clone();
        if let Some(msg) = pending {
            self.emit(&msg);
        }
        status
    }

    fn authenticate(&self, operation_id: u64, group_id: u32) -> i32 {
        self.record(DeviceCall::Authenticate(operation_id, group_id))
    }
}

/// Module handing out a pre-built device
pub struct FakeModule {
    device: Arc<FakeDevice>,
    fail_open: bool,
}

impl HwModule for FakeModule {
    fn open(&self, key: DeviceKey) -> std::result::Result<Arc<dyn FingerprintDevice>, DriverError> {
        if self.fail_open {
            return Err(DriverError::NoOpenMethod);
        }
        *self.device.key.lock() = Some(key);
        Ok(self.device.clone())
    }
}

/// Loader where every candidate works unless told otherwise.
///
/// Candidates are named the way the probe list names them: `class` for the
/// default module group, `class:group` otherwise.
#[derive(Default)]
pub struct FakeLoader {
    fail_load: Mutex<HashSet<String>>,
    fail_open: Mutex<HashSet<String>>,
    fail_notify: Mutex<HashMap<String, i32>>,
    attempts: Mutex<Vec<(String, String)>>,
    devices: Mutex<Vec<(String, Arc<FakeDevice>)>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_load(&self, candidate: &str) {
        self.fail_load.lock().insert(candidate.to_string());
    }

    pub fn fail_open(&self, candidate: &str) {
        self.fail_open.lock().insert(candidate.to_string());
    }

    pub fn fail_notify(&self, candidate: &str, status: i32) {
        self.fail_notify.lock().insert(candidate.to_string(), status);
    }

    /// Every (module id, class) pair asked for, in order
    pub fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().clone()
    }

    pub fn device_for(&self, candidate: &str) -> Option<Arc<FakeDevice>> {
        self.devices
            .lock()
            .iter()
            .find(|(name, _)| name == candidate)
            .map(|(_, d)| d.clone())
    }

    /// The most recent device whose notify callback was accepted
    pub fn opened_device(&self) -> Option<Arc<FakeDevice>> {
        self.devices
            .lock()
            .iter()
            .rev()
            .find(|(_, d)| d.notify.lock().is_some())
            .map(|(_, d)| d.clone())
    }
}

impl ModuleLoader for FakeLoader {
    fn load_module_by_class(
        &self,
        module_id: &str,
        class_name: &str,
    ) -> std::result::Result<Box<dyn HwModule>, DriverError> {
        self.attempts
            .lock()
            .push((module_id.to_string(), class_name.to_string()));

        let candidate = if module_id == DEFAULT_MODULE_ID {
            class_name.to_string()
        } else {
            format!("{}:{}", class_name, module_id)
        };
        if self.fail_load.lock().contains(&candidate) {
            return Err(DriverError::NotFound);
        }

        let device = FakeDevice::new();
        if let Some(status) = self.fail_notify.lock().get(&candidate) {
            device.set_notify_status(*status);
        }
        self.devices.lock().push((candidate.clone(), device.clone()));

        Ok(Box::new(FakeModule {
            device,
            fail_open: self.fail_open.lock().contains(&candidate),
        }))
    }
}

// ============================================================================
// UDFPS fakes
// ============================================================================

#[derive(Default)]
pub struct FakeUdfpsHandler {
    calls: Mutex<Vec<String>>,
}

impl FakeUdfpsHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl UdfpsHandler for FakeUdfpsHandler {
    fn init(&self, _device: Arc<dyn FingerprintDevice>) {
        self.record("init".to_string());
    }

    fn on_finger_down(&self, x: u32, y: u32, _minor: f32, _major: f32) {
        self.record(format!("finger_down {} {}", x, y));
    }

    fn on_finger_up(&self) {
        self.record("finger_up".to_string());
    }

    fn on_ui_ready(&self) {
        self.record("ui_ready".to_string());
    }

    fn on_acquired(&self, result: i32, vendor_code: i32) {
        self.record(format!("acquired {} {}", result, vendor_code));
    }

    fn cancel(&self) {
        self.record("cancel".to_string());
    }
}

pub struct FakeUdfpsFactory {
    fail_create: bool,
    created: Mutex<Option<Arc<FakeUdfpsHandler>>>,
    destroyed: Mutex<usize>,
}

impl FakeUdfpsFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_create: false,
            created: Mutex::new(None),
            destroyed: Mutex::new(0),
        })
    }

    /// A factory whose `create` always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_create: true,
            created: Mutex::new(None),
            destroyed: Mutex::new(0),
        })
    }

    pub fn created(&self) -> Option<Arc<FakeUdfpsHandler>> {
        self.created.lock().clone()
    }

    pub fn destroyed(&self) -> usize {
        *self.destroyed.lock()
    }
}

impl UdfpsHandlerFactory for FakeUdfpsFactory {
    fn create(&self) -> Option<Arc<dyn UdfpsHandler>> {
        if self.fail_create {
            return None;
        }
        let handler = FakeUdfpsHandler::new();
        *self.created.lock() = Some(handler.clone());
        Some(handler)
    }

    fn destroy(&self, _handler: Arc<dyn UdfpsHandler>) {
        *self.destroyed.lock() += 1;
    }
}

// ============================================================================
// Client callback
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    ChallengeGenerated(i64),
    ChallengeRevoked(i64),
    Acquired(AcquiredInfo, i32),
    Error(ErrorCode, i32),
    EnrollmentProgress(i32, i32),
    AuthenticationSucceeded(i32, Vec<u8>),
    AuthenticationFailed,
    LockoutTimed(i64),
    LockoutPermanent,
    LockoutCleared,
    InteractionDetected,
    EnrollmentsEnumerated(Vec<i32>),
    EnrollmentsRemoved(Vec<i32>),
    AuthenticatorIdRetrieved(i64),
    SessionClosed,
}

/// Client callback that records events and can simulate client death
#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<CallbackEvent>>,
    death: Mutex<Option<DeathRecipient>>,
    fail_link: Mutex<bool>,
    panic_on_acquired: Mutex<bool>,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CallbackEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn fail_link_to_death(&self) {
        *self.fail_link.lock() = true;
    }

    pub fn panic_on_acquired(&self) {
        *self.panic_on_acquired.lock() = true;
    }

    /// Run the registered death recipient, if any
    pub fn kill_client(&self) {
        let recipient = self.death.lock().take();
        if let Some(recipient) = recipient {
            recipient();
        }
    }

    fn push(&self, event: CallbackEvent) {
        self.events.lock().push(event);
    }
}

impl SessionCallback for RecordingCallback {
    fn on_challenge_generated(&self, challenge: i64) {
        self.push(CallbackEvent::ChallengeGenerated(challenge));
    }

    fn on_challenge_revoked(&self, challenge: i64) {
        self.push(CallbackEvent::ChallengeRevoked(challenge));
    }

    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32) {
        if *self.panic_on_acquired.lock() {
            panic!("callback failure");
        }
        self.push(CallbackEvent::Acquired(info, vendor_code));
    }

    fn on_error(&self, error: ErrorCode, vendor_code: i32) {
        self.push(CallbackEvent::Error(error, vendor_code));
    }

    fn on_enrollment_progress(&self, enrollment_id: i32, remaining: i32) {
        self.push(CallbackEvent::EnrollmentProgress(enrollment_id, remaining));
    }

    fn on_authentication_succeeded(&self, enrollment_id: i32, hat: &[u8]) {
        self.push(CallbackEvent::AuthenticationSucceeded(enrollment_id, hat.to_vec()));
    }

    fn on_authentication_failed(&self) {
        self.push(CallbackEvent::AuthenticationFailed);
    }

    fn on_lockout_timed(&self, duration_ms: i64) {
        self.push(CallbackEvent::LockoutTimed(duration_ms));
    }

    fn on_lockout_permanent(&self) {
        self.push(CallbackEvent::LockoutPermanent);
    }

    fn on_lockout_cleared(&self) {
        self.push(CallbackEvent::LockoutCleared);
    }

    fn on_interaction_detected(&self) {
        self.push(CallbackEvent::InteractionDetected);
    }

    fn on_enrollments_enumerated(&self, enrollment_ids: &[i32]) {
        self.push(CallbackEvent::EnrollmentsEnumerated(enrollment_ids.to_vec()));
    }

    fn on_enrollments_removed(&self, enrollment_ids: &[i32]) {
        self.push(CallbackEvent::EnrollmentsRemoved(enrollment_ids.to_vec()));
    }

    fn on_authenticator_id_retrieved(&self, authenticator_id: i64) {
        self.push(CallbackEvent::AuthenticatorIdRetrieved(authenticator_id));
    }

    fn on_session_closed(&self) {
        self.push(CallbackEvent::SessionClosed);
    }

    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()> {
        if *self.fail_link.lock() {
            return Err(FingerprintError::DeathLink("client already dead".to_string()));
        }
        *self.death.lock() = Some(recipient);
        Ok(())
    }
}

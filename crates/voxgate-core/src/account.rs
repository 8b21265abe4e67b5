// ── Account facade ───────────────────────────────────────────────────
//
// One `Account` owns the full lifecycle for a SmartPlus account: host
// resolution, sign-in (SMS handshake or pasted app tokens), device
// refresh, snapshot persistence, door commands, and the background
// door-log watcher. Cheap to clone; clones share all state.

use std::path::Path;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::sync::watch;
use tracing::{info, warn};
use voxgate_api::{CloudClient, region};

use crate::config::{AccountConfig, ScreenshotPolicy, SignIn};
use crate::convert;
use crate::error::CoreError;
use crate::event::{DoorEventReceiver, DoorEventSender, door_event_channel};
use crate::model::{DeviceSnapshot, DeviceTopology};
use crate::poller::DoorLogPoller;
use crate::store::{AccountStore, keys};

/// Where session establishment currently stands.
///
/// States only move forward within one connect cycle; re-running an
/// earlier step with already-valid data is harmless and changes
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountState {
    /// Nothing resolved yet.
    Unconfigured,
    /// The tenant REST host is known.
    HostResolved,
    /// The cloud accepted the token pair.
    Authenticated,
    /// Device topology fetched and persisted.
    DeviceDataLoaded,
}

/// Handle to one configured SmartPlus account.
#[derive(Clone)]
pub struct Account {
    inner: Arc<AccountInner>,
}

struct AccountInner {
    config: AccountConfig,
    client: Arc<CloudClient>,
    store: AccountStore,
    state: watch::Sender<AccountState>,
    topology: watch::Sender<Arc<DeviceTopology>>,
    door_events: DoorEventSender,
    poller: DoorLogPoller,
}

impl Account {
    /// Build an account against the production cloud endpoints, with
    /// persistent state under `store_dir`.
    pub fn new(config: AccountConfig, store_dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let client = CloudClient::new(&config.transport)?;
        let store = AccountStore::new(store_dir);
        Ok(Self::with_client(config, client, store))
    }

    /// Build an account over an existing API client and store. Tests
    /// and embedders with custom wiring go through here.
    pub fn with_client(config: AccountConfig, client: CloudClient, store: AccountStore) -> Self {
        let client = Arc::new(client);
        client.update_session(|session| {
            if let Some(host) = &config.host {
                session.host.clone_from(host);
            }
            session.phone_number.clone_from(&config.phone_number);
        });
        let (state, _) = watch::channel(AccountState::Unconfigured);
        let (topology, _) = watch::channel(Arc::new(DeviceTopology::default()));
        let (door_events, _) = door_event_channel();
        let poller = DoorLogPoller::new(
            Arc::clone(&client),
            store.clone(),
            door_events.clone(),
            config.poll_interval,
            config.poll_start_guard,
        );
        Self {
            inner: Arc::new(AccountInner {
                config,
                client,
                store,
                state,
                topology,
                door_events,
                poller,
            }),
        }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &AccountStore {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Establish the session end to end: resolve the regional host,
    /// seed tokens, validate them against the cloud, load and persist
    /// the device topology, and start the door-log watcher.
    ///
    /// Needs a token pair from configuration or a previous run; with
    /// neither, drive the SMS flow first.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.ensure_host().await?;
        self.seed_session().await;
        if !self.inner.client.session().has_tokens() {
            return Err(CoreError::AuthenticationFailed {
                message: "no token pair available; complete the SMS sign-in first".to_owned(),
            });
        }
        self.refresh().await?;
        self.start_watching().await;
        info!(title = %self.title(), "account connected");
        Ok(())
    }

    /// Wind the account down: stop the watcher. Session state and the
    /// persisted snapshot stay intact for the next connect.
    pub async fn disconnect(&self) {
        self.stop_watching().await;
        info!("account disconnected");
    }

    /// Re-run servers list, device config, and temp keys, then persist
    /// the refreshed snapshot.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.sign_in().await?;

        let conf = self
            .inner
            .client
            .fetch_userconf()
            .await
            .map_err(device_list_error)?;
        let session = self.inner.client.session();
        let mut topology = convert::device_topology_from_userconf(&conf, &session.rtsp_relay_ip);
        let records = self
            .inner
            .client
            .fetch_temp_keys()
            .await
            .map_err(device_list_error)?;
        topology.temporary_keys = convert::temporary_keys_from_records(&records, &session.subdomain);

        info!(
            project = %topology.project_name,
            cameras = topology.cameras.len(),
            relays = topology.door_relays.len(),
            temp_keys = topology.temporary_keys.len(),
            "device topology refreshed"
        );

        let snapshot = DeviceSnapshot {
            host: session.host,
            token: session.token,
            auth_token: session.auth_token,
            camera_data: topology.cameras.clone(),
            door_relay_data: topology.door_relays.clone(),
            door_keys_data: topology.temporary_keys.clone(),
        };
        self.inner.store.persist_snapshot(&snapshot).await?;

        self.inner.topology.send_replace(Arc::new(topology));
        self.advance(AccountState::DeviceDataLoaded);
        Ok(())
    }

    // ── SMS sign-in flow ─────────────────────────────────────────────

    /// Ask the cloud to text a one-time code to the configured number.
    pub async fn request_sms_code(&self) -> Result<(), CoreError> {
        self.ensure_host().await?;
        let config = &self.inner.config;
        let accepted = self
            .inner
            .client
            .request_sms_code(&config.country_code, &config.phone_number)
            .await?;
        if accepted {
            info!("SMS verification code requested");
            Ok(())
        } else {
            Err(CoreError::Api {
                message: "SMS code request failed".to_owned(),
            })
        }
    }

    /// Complete the SMS flow with the code the user received, then
    /// validate the fresh token pair against the cloud.
    pub async fn sign_in_with_sms_code(&self, sms_code: &str) -> Result<(), CoreError> {
        self.ensure_host().await?;
        let config = &self.inner.config;
        self.inner
            .client
            .verify_sms_code(&config.phone_number, &config.country_code, sms_code)
            .await
            .map_err(|err| match err {
                voxgate_api::Error::Authentication { .. } | voxgate_api::Error::Api { .. } => {
                    CoreError::AuthenticationFailed {
                        message: "Invalid SMS code".to_owned(),
                    }
                }
                other => other.into(),
            })?;
        self.sign_in().await
    }

    // ── Door commands ────────────────────────────────────────────────

    /// Trigger a door relay by its display door name. Fire-and-forget
    /// on the wire; the returned flag only reflects whether the cloud
    /// acknowledged the command.
    pub async fn open_door(&self, door_name: &str) -> Result<bool, CoreError> {
        let topology = self.topology_snapshot();
        let relay = topology
            .door_relays
            .iter()
            .find(|relay| relay.door_name == door_name)
            .ok_or_else(|| CoreError::RelayNotFound {
                name: door_name.to_owned(),
            })?;
        let opened = self
            .inner
            .client
            .open_door(&relay.door_name, &relay.mac, &relay.relay_id)
            .await?;
        if opened {
            info!(door = %relay.door_name, "door relay triggered");
        } else {
            warn!(door = %relay.door_name, "door relay trigger rejected by the cloud");
        }
        Ok(opened)
    }

    // ── Watcher control ──────────────────────────────────────────────

    /// Start the background door-log watcher. Returns `false` when a
    /// watcher is already running here or heartbeated recently from
    /// another process.
    pub async fn start_watching(&self) -> bool {
        self.inner.poller.start().await
    }

    /// Stop the watcher and wait for it to finish.
    pub async fn stop_watching(&self) {
        self.inner.poller.stop().await;
    }

    /// Whether this process currently runs the watcher loop.
    pub fn is_watching(&self) -> bool {
        self.inner.poller.is_polling()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Watch lifecycle transitions.
    pub fn account_state(&self) -> watch::Receiver<AccountState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to new door-log events.
    pub fn door_events(&self) -> DoorEventReceiver {
        self.inner.door_events.subscribe()
    }

    /// Watch topology replacements.
    pub fn topology_changes(&self) -> watch::Receiver<Arc<DeviceTopology>> {
        self.inner.topology.subscribe()
    }

    /// Latest parsed device topology.
    pub fn topology_snapshot(&self) -> Arc<DeviceTopology> {
        self.inner.topology.borrow().clone()
    }

    /// Display title: the cloud's trimmed project name, empty when the
    /// cloud provides none.
    pub fn title(&self) -> String {
        self.inner.topology.borrow().project_name.clone()
    }

    /// Denormalized session-plus-topology snapshot, identical to what
    /// [`refresh`](Self::refresh) persists.
    pub fn device_snapshot(&self) -> DeviceSnapshot {
        let session = self.inner.client.session();
        let topology = self.inner.topology.borrow();
        DeviceSnapshot {
            host: session.host,
            token: session.token,
            auth_token: session.auth_token,
            camera_data: topology.cameras.clone(),
            door_relay_data: topology.door_relays.clone(),
            door_keys_data: topology.temporary_keys.clone(),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Make sure the session has a subdomain and a tenant host,
    /// resolving and persisting them when missing.
    async fn ensure_host(&self) -> Result<(), CoreError> {
        let subdomain = self.resolve_subdomain().await;
        self.inner
            .client
            .update_session(|session| session.subdomain = subdomain);

        if self.inner.client.session().has_host() {
            self.advance(AccountState::HostResolved);
            return Ok(());
        }
        let host = self.inner.client.resolve_rest_host().await?;
        if let Err(err) = self.inner.store.set(keys::HOST, &host).await {
            warn!(error = %err, "could not persist the resolved host");
        }
        self.advance(AccountState::HostResolved);
        Ok(())
    }

    /// Persisted subdomain from a previous run, or a fresh lookup from
    /// the configured country code (persisted for next time).
    async fn resolve_subdomain(&self) -> String {
        if let Some(stored) = self
            .inner
            .store
            .subdomain()
            .await
            .filter(|subdomain| !subdomain.is_empty())
        {
            return stored;
        }
        let resolved =
            region::subdomain_for_calling_code(&self.inner.config.country_code).to_owned();
        if let Err(err) = self.inner.store.set(keys::SUBDOMAIN, &resolved).await {
            warn!(error = %err, "could not persist the resolved subdomain");
        }
        resolved
    }

    /// Fill the session with a token pair, preferring persisted tokens
    /// from a previous run unless configured otherwise, and persist
    /// the live screenshot policy.
    async fn seed_session(&self) {
        let config = &self.inner.config;
        let (config_auth, config_token) = match &config.sign_in {
            SignIn::Tokens { auth_token, token } => (
                Some(auth_token.expose_secret().to_owned()),
                Some(token.expose_secret().to_owned()),
            ),
            SignIn::Sms => (None, None),
        };
        let stored_auth: Option<String> = self.inner.store.get(keys::AUTH_TOKEN).await;
        let stored_token: Option<String> = self.inner.store.get(keys::TOKEN).await;
        let auth_token = choose_value(stored_auth, config_auth, config.prefer_config_tokens);
        let token = choose_value(stored_token, config_token, config.prefer_config_tokens);
        self.inner.client.update_session(|session| {
            if let Some(auth_token) = auth_token {
                session.auth_token = auth_token;
            }
            if let Some(token) = token {
                session.token = token;
            }
        });

        let wait = config.screenshot_policy == ScreenshotPolicy::Wait;
        if let Err(err) = self.inner.store.set(keys::WAIT_FOR_IMAGE_URL, &wait).await {
            warn!(error = %err, "could not persist the screenshot policy");
        }
    }

    /// Validate the token pair with a servers-list call, persist the
    /// refreshed pair, and mark the account authenticated.
    async fn sign_in(&self) -> Result<(), CoreError> {
        self.inner.client.fetch_servers_list().await?;
        let session = self.inner.client.session();
        let mut data = self.inner.store.load().await;
        data.insert(keys::HOST.to_owned(), session.host.into());
        data.insert(keys::TOKEN.to_owned(), session.token.into());
        data.insert(keys::AUTH_TOKEN.to_owned(), session.auth_token.into());
        if let Err(err) = self.inner.store.save(data).await {
            warn!(error = %err, "could not persist session tokens");
        }
        self.advance(AccountState::Authenticated);
        Ok(())
    }

    fn advance(&self, target: AccountState) {
        self.inner.state.send_if_modified(|state| {
            if target > *state {
                *state = target;
                true
            } else {
                false
            }
        });
    }
}

/// Prefix device-fetch failures with a message fit for inline display,
/// leaving communication and authentication errors untouched so
/// callers can still branch on them.
fn device_list_error(err: voxgate_api::Error) -> CoreError {
    match CoreError::from(err) {
        CoreError::Api { message } => CoreError::Api {
            message: format!("Unable to retrieve device list: {message}"),
        },
        other => other,
    }
}

/// Pick between a persisted value and a configured one. Empty strings
/// count as missing; the flag flips the preference toward
/// configuration.
fn choose_value(
    stored: Option<String>,
    configured: Option<String>,
    prefer_config: bool,
) -> Option<String> {
    let stored = stored.filter(|value| !value.is_empty());
    let configured = configured.filter(|value| !value.is_empty());
    if prefer_config {
        configured.or(stored)
    } else {
        stored.or(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_tokens_win_by_default() {
        assert_eq!(
            choose_value(Some("stored".into()), Some("configured".into()), false),
            Some("stored".to_owned())
        );
    }

    #[test]
    fn configured_tokens_win_with_the_override() {
        assert_eq!(
            choose_value(Some("stored".into()), Some("configured".into()), true),
            Some("configured".to_owned())
        );
    }

    #[test]
    fn empty_values_count_as_missing() {
        assert_eq!(
            choose_value(Some(String::new()), Some("configured".into()), false),
            Some("configured".to_owned())
        );
        assert_eq!(choose_value(Some(String::new()), None, true), None);
    }

    #[test]
    fn state_only_moves_forward() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let account = Account::new(AccountConfig::default(), dir.path()).expect("account");
        assert_eq!(*account.account_state().borrow(), AccountState::Unconfigured);
        account.advance(AccountState::Authenticated);
        account.advance(AccountState::HostResolved);
        assert_eq!(*account.account_state().borrow(), AccountState::Authenticated);
    }
}

//! Authenticated endpoints: device topology, door relays, and the
//! activities web API (guest keys, personal door log).

use reqwest::Method;
use reqwest::header::HeaderValue;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{CloudClient, Payload, decode, envelope_success};
use crate::error::Error;
use crate::models::{DoorLogEntry, TempKeyRecord, UserConf};
use crate::transport;

const USERCONF_API_VERSION: &str = "6.5";
const OPENDOOR_API_VERSION: &str = "4.3";

impl CloudClient {
    /// Fetch the account's device topology (intercoms, relays, household
    /// metadata).
    ///
    /// `GET /userconf` on the tenant host.
    pub async fn fetch_userconf(&self) -> Result<UserConf, Error> {
        let session = self.session();
        let mut headers = transport::app_headers();
        headers.insert("x-auth-token", HeaderValue::from_str(&session.token)?);
        headers.insert(
            "api-version",
            HeaderValue::from_static(USERCONF_API_VERSION),
        );
        let url = self.tenant_url(&format!("userconf?token={}", session.token));
        let payload = self
            .request_json(&Method::GET, url, headers, Payload::Empty)
            .await?;
        decode(payload, "userconf")
    }

    /// Fire a door-open request at one relay.
    ///
    /// `POST /opendoor` on the tenant host with a form body naming the
    /// device MAC and relay id. Fire and forget: no retry, so duplicate
    /// presses pulse the relay twice.
    pub async fn open_door(&self, name: &str, mac: &str, relay_id: &str) -> Result<bool, Error> {
        debug!("requesting door relay {relay_id} on {mac} ({name})");
        let session = self.session();
        let mut headers = transport::app_headers();
        headers.insert("x-auth-token", HeaderValue::from_str(&session.token)?);
        headers.insert(
            "api-version",
            HeaderValue::from_static(OPENDOOR_API_VERSION),
        );
        let url = self.tenant_url(&format!("opendoor?token={}", session.token));
        let form = vec![
            ("mac".to_owned(), mac.to_owned()),
            ("relay".to_owned(), relay_id.to_owned()),
        ];
        let payload = self
            .request_json(&Method::POST, url, headers, Payload::Form(form))
            .await?;
        let accepted = envelope_success(payload.as_ref());
        if accepted {
            debug!("door open request for {name} accepted");
        } else {
            warn!("door open request for {name} rejected");
        }
        Ok(accepted)
    }

    /// Fetch the guest (temporary) keys issued for this account.
    ///
    /// `GET tempKey/getPersonalTempKeyList` on the activities API.
    pub async fn fetch_temp_keys(&self) -> Result<Vec<TempKeyRecord>, Error> {
        let session = self.session();
        let mut headers = transport::web_headers();
        headers.insert("x-auth-token", HeaderValue::from_str(&session.token)?);
        let referer = format!(
            "https://{}.akuvox.com/smartplus/TmpKey.html?TOKEN={}&USERTYPE=20&VERSION=6.6",
            session.subdomain, session.token
        );
        headers.insert("referer", HeaderValue::from_str(&referer)?);
        let url = self.activities_url("tempKey/getPersonalTempKeyList");
        let payload = self
            .request_json(&Method::GET, url, headers, Payload::Empty)
            .await?;
        decode(
            payload.map(unwrap_rows),
            "tempKey/getPersonalTempKeyList",
        )
    }

    /// Fetch the personal door log, newest entry first.
    ///
    /// `GET log/getDoorLog` on the activities API. An empty list usually
    /// means the account lives on the other deployment variant, so the
    /// variant is toggled and the fetch retried once before giving up
    /// for this round. An empty return means "nothing usable right now",
    /// never an error.
    pub async fn fetch_door_log(&self) -> Result<Vec<DoorLogEntry>, Error> {
        match self.fetch_door_log_once().await? {
            Some(rows) if !rows.is_empty() => Ok(rows),
            Some(_) => {
                let variant = self.deployment_variant().toggled();
                debug!("door log came back empty, retrying on the {variant} variant");
                self.set_deployment_variant(variant);
                match self.fetch_door_log_once().await? {
                    Some(rows) if !rows.is_empty() => Ok(rows),
                    _ => {
                        warn!("no personal door log entries from either variant");
                        Ok(Vec::new())
                    }
                }
            }
            None => {
                warn!("unable to retrieve the personal door log");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_door_log_once(&self) -> Result<Option<Vec<DoorLogEntry>>, Error> {
        let session = self.session();
        let mut headers = transport::web_headers();
        headers.insert("x-auth-token", HeaderValue::from_str(&session.token)?);
        let referer = format!(
            "https://{}.akuvox.com/smartplus/Activities.html?TOKEN={}",
            session.subdomain, session.token
        );
        headers.insert("referer", HeaderValue::from_str(&referer)?);
        let url = self.activities_url("log/getDoorLog");
        let payload = self
            .request_json(&Method::GET, url, headers, Payload::Empty)
            .await?;
        match payload {
            Some(value) => Ok(Some(decode(Some(unwrap_rows(value)), "log/getDoorLog")?)),
            None => Ok(None),
        }
    }
}

/// Some deployments wrap list payloads in `{"rows": [...]}`; unwrap when
/// present and pass everything else through for the decoder to judge.
fn unwrap_rows(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => match map.remove("rows") {
            Some(rows) => rows,
            None => Value::Object(map),
        },
        other => other,
    }
}

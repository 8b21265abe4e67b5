//! Sign-in endpoints: gateway bootstrap, SMS verification, and the
//! servers-list call both login flows converge on.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::debug;

use crate::client::{CloudClient, Payload, decode, envelope_success};
use crate::error::Error;
use crate::models::{LoginInfo, RestServerInfo};
use crate::session::obfuscate_phone_number;
use crate::transport;

const REST_SERVER_API_VERSION: &str = "6.0";
const SMS_LOGIN_API_VERSION: &str = "6.6";
const SERVERS_LIST_API_VERSION: &str = "6.6";

impl CloudClient {
    /// Resolve the tenant REST host from the bootstrap gateway.
    ///
    /// `GET /rest_server` is the only unauthenticated call in the whole
    /// API. The resolved authority is stored on the session and
    /// returned.
    pub async fn resolve_rest_host(&self) -> Result<String, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-version",
            HeaderValue::from_static(REST_SERVER_API_VERSION),
        );
        let payload = self
            .request_json(
                &Method::GET,
                self.gateway_url("rest_server"),
                headers,
                Payload::Empty,
            )
            .await?;
        let info: RestServerInfo = decode(payload, "rest_server")?;
        let Some(host) = info.rest_server_https.filter(|h| !h.is_empty()) else {
            return Err(Error::Api {
                message: "rest_server response carried no https host".to_owned(),
            });
        };
        debug!("resolved tenant REST host {host}");
        self.update_session(|session| session.host.clone_from(&host));
        Ok(host)
    }

    /// Ask the cloud to text a verification code to the subscriber.
    ///
    /// `POST /send_mobile_checkcode` on the tenant host. Returns whether
    /// the vendor accepted the request; rejection is not an error since
    /// the user can simply retry from the setup form.
    pub async fn request_sms_code(
        &self,
        country_code: &str,
        phone_number: &str,
    ) -> Result<bool, Error> {
        let mut headers = transport::app_headers();
        headers.insert("x-auth-token", HeaderValue::from_static(""));
        let form = vec![
            ("AreaCode".to_owned(), country_code.to_owned()),
            ("MobileNumber".to_owned(), phone_number.to_owned()),
            ("Type".to_owned(), "0".to_owned()),
        ];
        let payload = self
            .request_json(
                &Method::POST,
                self.tenant_url("send_mobile_checkcode"),
                headers,
                Payload::Form(form),
            )
            .await?;
        Ok(envelope_success(payload.as_ref()))
    }

    /// Exchange a texted verification code for the account token pair.
    ///
    /// `GET /sms_login` on the gateway. The phone number travels in
    /// obfuscated form. On success the token pair, and the RTSP relay
    /// when present, land on the session.
    pub async fn verify_sms_code(
        &self,
        phone_number: &str,
        country_code: &str,
        sms_code: &str,
    ) -> Result<LoginInfo, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-version",
            HeaderValue::from_static(SMS_LOGIN_API_VERSION),
        );
        let obfuscated = obfuscate_phone_number(phone_number);
        let url = format!(
            "{}?phone={obfuscated}&code={sms_code}&area_code={country_code}",
            self.gateway_url("sms_login")
        );
        let payload = self
            .request_json(&Method::GET, url, headers, Payload::Empty)
            .await?;
        let info: LoginInfo = decode(payload, "sms_login")?;
        self.update_session(|session| session.phone_number = phone_number.to_owned());
        self.apply_login(&info);
        Ok(info)
    }

    /// Refresh the token pair and learn the RTSP relay address.
    ///
    /// `POST /servers_list` on the gateway, authenticated with the
    /// current token pair. Both the SMS flow and the app-token flow end
    /// up here; for pasted app tokens this call doubles as validation.
    pub async fn fetch_servers_list(&self) -> Result<LoginInfo, Error> {
        let session = self.session();
        let mut headers = transport::app_headers();
        headers.insert("x-auth-token", HeaderValue::from_str(&session.token)?);
        headers.insert(
            "api-version",
            HeaderValue::from_static(SERVERS_LIST_API_VERSION),
        );
        let body = json!({
            "auth_token": session.auth_token,
            "passwd": session.auth_token,
            "token": session.token,
            "user": obfuscate_phone_number(&session.phone_number),
        });
        let payload = self
            .request_json(
                &Method::POST,
                self.gateway_url("servers_list"),
                headers,
                Payload::Json(body),
            )
            .await?;
        let info: LoginInfo = decode(payload, "servers_list")?;
        self.apply_login(&info);
        Ok(info)
    }

    /// Fold an optional-field login payload into the session. Absent
    /// fields leave prior values untouched.
    fn apply_login(&self, info: &LoginInfo) {
        self.update_session(|session| {
            if let Some(auth_token) = &info.auth_token {
                session.auth_token.clone_from(auth_token);
            }
            if let Some(token) = &info.token {
                session.token.clone_from(token);
            }
            if let Some(ip) = info.rtsp_relay_ip() {
                session.rtsp_relay_ip = ip.to_owned();
            }
        });
    }
}

//! HTTP side of the clock: the five endpoints its web server exposes.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::record::{ConfigRecord, LedMode, Rgb};

pub const DEFAULT_DEVICE: &str = "http://192.168.4.1";

/// Everything the settings page asks of the clock.
pub trait DeviceApi: Send + Sync + 'static {
    /// `GET /data`
    fn fetch_config(&self) -> impl Future<Output = Result<ConfigRecord>> + Send;
    /// `GET /rgb?red=&green=&blue=`
    fn push_color(&self, rgb: Rgb) -> impl Future<Output = Result<()>> + Send;
    /// `GET /led_mode?mode=`
    fn push_mode(&self, mode: LedMode) -> impl Future<Output = Result<()>> + Send;
    /// `POST /update`
    fn save_config(&self, record: &ConfigRecord) -> impl Future<Output = Result<()>> + Send;
    /// `POST /reboot`, returns whatever text the device answers with.
    fn reboot(&self) -> impl Future<Output = Result<String>> + Send;
}

pub struct HttpDevice {
    client: reqwest::Client,
    base: Url,
}

impl HttpDevice {
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base: base_url(address)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("joining '{path}' onto {}", self.base))
    }
}

/// Accepts `192.168.4.1`, `clock.local:8080` or a full URL and returns a base
/// that endpoint paths can be joined onto.
pub fn base_url(address: &str) -> Result<Url> {
    let address = address.trim();
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let mut url =
        Url::parse(&with_scheme).with_context(|| format!("invalid device address '{address}'"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl DeviceApi for HttpDevice {
    async fn fetch_config(&self) -> Result<ConfigRecord> {
        let url = self.url("data")?;
        let record = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /data")?
            .error_for_status()
            .context("GET /data")?
            .json::<ConfigRecord>()
            .await
            .context("decoding /data")?;
        Ok(record)
    }

    async fn push_color(&self, rgb: Rgb) -> Result<()> {
        let url = self.url("rgb")?;
        self.client
            .get(url)
            .query(&[("red", rgb.r), ("green", rgb.g), ("blue", rgb.b)])
            .send()
            .await
            .context("GET /rgb")?
            .error_for_status()
            .context("GET /rgb")?;
        Ok(())
    }

    async fn push_mode(&self, mode: LedMode) -> Result<()> {
        let url = self.url("led_mode")?;
        self.client
            .get(url)
            .query(&[("mode", mode.as_str())])
            .send()
            .await
            .context("GET /led_mode")?
            .error_for_status()
            .context("GET /led_mode")?;
        Ok(())
    }

    async fn save_config(&self, record: &ConfigRecord) -> Result<()> {
        let url = self.url("update")?;
        self.client
            .post(url)
            .json(record)
            .send()
            .await
            .context("POST /update")?
            .error_for_status()
            .context("POST /update")?;
        Ok(())
    }

    async fn reboot(&self) -> Result<String> {
        let url = self.url("reboot")?;
        let text = self
            .client
            .post(url)
            .json(&serde_json::json!({ "action": "reboot" }))
            .send()
            .await
            .context("POST /reboot")?
            .error_for_status()
            .context("POST /reboot")?
            .text()
            .await
            .context("reading /reboot reply")?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(Method, String, String)>>>;

    async fn fake_clock(State(log): State<Log>, method: Method, uri: Uri, body: String) -> Response {
        let path = uri.path().to_string();
        log.lock()
            .unwrap()
            .push((method.clone(), uri.to_string(), body));
        match (method, path.as_str()) {
            (Method::GET, "/data") => (
                [("content-type", "application/json")],
                r#"{"ssid":"home","colon":"1","color":{"r":"12","g":"34","b":"56"},
                   "time":{"city":"Los Angeles","timezone":"PST8PDT,M3.2.0,M11.1.0","time_fmt":"1"},
                   "led_mode":"spectrum"}"#,
            )
                .into_response(),
            (Method::POST, "/reboot") => "Rebooting...".into_response(),
            (Method::POST, "/update") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => StatusCode::OK.into_response(),
        }
    }

    async fn spawn_clock() -> (HttpDevice, Log) {
        let log: Log = Arc::default();
        let app = Router::new().fallback(fake_clock).with_state(log.clone());
        (serve(app).await, log)
    }

    async fn serve(app: Router) -> HttpDevice {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        HttpDevice::new(&addr.to_string(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn base_url_accepts_bare_hosts() {
        assert_eq!(base_url("192.168.4.1").unwrap().as_str(), "http://192.168.4.1/");
        assert_eq!(
            base_url("http://clock.local:8080/panel").unwrap().as_str(),
            "http://clock.local:8080/panel/"
        );
        assert!(base_url("http://").is_err());
    }

    #[tokio::test]
    async fn fetch_decodes_device_document() {
        let (device, log) = spawn_clock().await;
        let record = device.fetch_config().await.unwrap();
        assert_eq!(record.ssid, "home");
        assert_eq!(record.color, Rgb::new(12, 34, 56));
        assert_eq!(record.led_mode, LedMode::Spectrum);
        assert_eq!(log.lock().unwrap()[0].1, "/data");
    }

    #[tokio::test]
    async fn color_and_mode_go_out_as_query_strings() {
        let (device, log) = spawn_clock().await;
        device.push_color(Rgb::new(1, 2, 3)).await.unwrap();
        device.push_mode(LedMode::Static).await.unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log[0].0, Method::GET);
        assert_eq!(log[0].1, "/rgb?red=1&green=2&blue=3");
        assert_eq!(log[1].1, "/led_mode?mode=static");
    }

    #[tokio::test]
    async fn reboot_posts_action_and_returns_text() {
        let (device, log) = spawn_clock().await;
        assert_eq!(device.reboot().await.unwrap(), "Rebooting...");
        let log = log.lock().unwrap();
        assert_eq!(log[0].0, Method::POST);
        let body: serde_json::Value = serde_json::from_str(&log[0].2).unwrap();
        assert_eq!(body, serde_json::json!({ "action": "reboot" }));
    }

    #[tokio::test]
    async fn reboot_reply_cut_short_is_an_error() {
        async fn cut() -> axum::body::Body {
            let chunks: Vec<Result<axum::body::Bytes, std::io::Error>> = vec![
                Ok(axum::body::Bytes::from_static(b"Reboo")),
                Err(std::io::Error::other("connection dropped")),
            ];
            axum::body::Body::from_stream(futures::stream::iter(chunks))
        }
        let device = serve(Router::new().route("/reboot", axum::routing::post(cut))).await;
        assert!(device.reboot().await.is_err());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (device, log) = spawn_clock().await;
        let record = ConfigRecord {
            color: Rgb::new(10, 20, 30),
            ..Default::default()
        };
        assert!(device.save_config(&record).await.is_err());
        let body: serde_json::Value = serde_json::from_str(&log.lock().unwrap()[0].2).unwrap();
        assert_eq!(body["color"], serde_json::json!({ "r": 10, "g": 20, "b": 30 }));
    }

    #[tokio::test]
    async fn unreachable_device_is_an_error() {
        let device = HttpDevice::new("127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(device.fetch_config().await.is_err());
    }
}

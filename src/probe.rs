use crate::error::Result;
use crate::traits::Prober;
use crate::types::{Mirror, Sample};
use async_trait::async_trait;
use reqwest::{redirect, Client, ClientBuilder, StatusCode};
use std::time::{Duration, Instant};

/// Redirect hops followed before a probe is counted as failed
const MAX_REDIRECTS: usize = 10;

/// KB/s for `bytes` transferred in `elapsed`.
/// A zero duration is clamped to one nanosecond so the result stays finite.
pub fn throughput_kbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.max(Duration::from_nanos(1)).as_secs_f64();
    bytes as f64 / secs / 1024.0
}

/// 基于 reqwest 的 HTTP 测速器
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// 构建 Client, 强制设置超时
    fn builder(timeout: Duration) -> ClientBuilder {
        Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("pipspeed/", env!("CARGO_PKG_VERSION")))
    }

    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Self::builder(timeout).build()?;
        Ok(Self { client })
    }

    #[cfg(test)]
    pub fn without_proxy(timeout: Duration) -> Result<Self> {
        let client = Self::builder(timeout).no_proxy().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, mirror: &Mirror, package: &str) -> Sample {
        let url = mirror.package_url(package);
        let start = Instant::now();

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // 连接超时、DNS 解析失败等
                tracing::debug!(mirror = %mirror.name, %url, error = %e, "probe failed");
                return Sample::failed(&mirror.name);
            }
        };

        if resp.status() != StatusCode::OK {
            tracing::debug!(mirror = %mirror.name, %url, status = %resp.status(), "probe rejected");
            return Sample::failed(&mirror.name);
        }

        // The clock keeps running until the whole body has arrived
        match resp.bytes().await {
            Ok(body) => {
                let elapsed = start.elapsed();
                let kb_per_sec = throughput_kbps(body.len(), elapsed);
                tracing::debug!(
                    mirror = %mirror.name,
                    %url,
                    bytes = body.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    kb_per_sec,
                    "probe finished"
                );
                Sample::success(&mirror.name, kb_per_sec, body.len(), elapsed)
            }
            Err(e) => {
                tracing::debug!(mirror = %mirror.name, %url, error = %e, "reading body failed");
                Sample::failed(&mirror.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeOutcome;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 responder.
    /// `respond` maps the request path to (status line, extra headers, body).
    async fn serve_with<F>(respond: F) -> SocketAddr
    where
        F: Fn(&str) -> (String, String, Vec<u8>) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut request = Vec::new();
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, headers, body) = respond(&path);
                    let head = format!(
                        "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        headers,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        addr
    }

    /// Answers every request with the same `status` and `body`
    async fn serve(status: &'static str, body: Vec<u8>) -> SocketAddr {
        serve_with(move |_| (status.to_string(), String::new(), body.clone())).await
    }

    /// `/r{n}/...` redirects to `/r{n-1}/...` until `/r0/...`, which returns a 200 page
    async fn serve_redirect_chain() -> SocketAddr {
        serve_with(|path| {
            let rest = path.trim_start_matches("/r");
            let (hops, tail) = rest.split_once('/').unwrap_or((rest, ""));
            match hops.parse::<usize>() {
                Ok(0) => ("200 OK".to_string(), String::new(), vec![b'y'; 1024]),
                Ok(n) => (
                    "301 Moved Permanently".to_string(),
                    format!("Location: /r{}/{}\r\n", n - 1, tail),
                    Vec::new(),
                ),
                Err(_) => ("404 Not Found".to_string(), String::new(), Vec::new()),
            }
        })
        .await
    }

    #[test]
    fn test_throughput_kbps() {
        assert_eq!(throughput_kbps(1024, Duration::from_secs(1)), 1.0);
        assert_eq!(throughput_kbps(4096, Duration::from_millis(500)), 8.0);
        assert_eq!(throughput_kbps(0, Duration::from_secs(1)), 0.0);

        let clamped = throughput_kbps(1024, Duration::ZERO);
        assert!(clamped.is_finite());
        assert!(clamped > 0.0);
    }

    #[tokio::test]
    async fn test_probe_success() -> Result<()> {
        let addr = serve("200 OK", vec![b'x'; 2048]).await;
        let mirror = Mirror::new("Local", &format!("http://{}/simple", addr));
        let prober = HttpProber::without_proxy(Duration::from_secs(5))?;

        let sample = prober.probe(&mirror, "numpy").await;
        assert_eq!(sample.mirror, "Local");
        match sample.outcome {
            ProbeOutcome::Success {
                kb_per_sec, bytes, ..
            } => {
                assert_eq!(bytes, 2048);
                assert!(kb_per_sec > 0.0);
            }
            ProbeOutcome::Failed => panic!("expected a successful probe"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_non_200_fails() -> Result<()> {
        let addr = serve("404 Not Found", b"missing".to_vec()).await;
        let mirror = Mirror::new("Local", &format!("http://{}/simple", addr));
        let prober = HttpProber::without_proxy(Duration::from_secs(5))?;

        let sample = prober.probe(&mirror, "no-such-package").await;
        assert_eq!(sample, Sample::failed("Local"));
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_connection_refused_fails() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mirror = Mirror::new("Gone", &format!("http://{}/simple", addr));
        let prober = HttpProber::without_proxy(Duration::from_secs(5))?;

        assert_eq!(prober.probe(&mirror, "numpy").await, Sample::failed("Gone"));
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_timeout_fails() -> Result<()> {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mirror = Mirror::new("Slow", &format!("http://{}/simple", addr));
        let prober = HttpProber::without_proxy(Duration::from_millis(300))?;

        assert_eq!(prober.probe(&mirror, "numpy").await, Sample::failed("Slow"));
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_follows_redirect() -> Result<()> {
        let addr = serve_redirect_chain().await;
        let mirror = Mirror::new("Moved", &format!("http://{}/r1", addr));
        let prober = HttpProber::without_proxy(Duration::from_secs(5))?;

        let sample = prober.probe(&mirror, "numpy").await;
        assert!(
            matches!(sample.outcome, ProbeOutcome::Success { bytes: 1024, .. }),
            "{:?}",
            sample
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_redirect_limit() -> Result<()> {
        let addr = serve_redirect_chain().await;
        let prober = HttpProber::without_proxy(Duration::from_secs(5))?;

        let at_limit = Mirror::new("Ten", &format!("http://{}/r{}", addr, MAX_REDIRECTS));
        let sample = prober.probe(&at_limit, "numpy").await;
        assert!(sample.speed().is_some(), "{:?}", sample);

        let over_limit = Mirror::new("Eleven", &format!("http://{}/r{}", addr, MAX_REDIRECTS + 1));
        assert_eq!(
            prober.probe(&over_limit, "numpy").await,
            Sample::failed("Eleven")
        );
        Ok(())
    }
}

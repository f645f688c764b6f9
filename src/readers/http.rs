//! Fetch data over HTTP(S)
//!
//! The [`HttpReader`] retrieves advisory pages. Advisory hosts are not always
//! reliable, so a request failing with a server error or a connection error is
//! retried with an exponential backoff. Client errors are final.
//!
//! The network and the clock are behind two small traits, [`HttpTransport`]
//! and [`Sleeper`], so the retry policy can be exercised without either.

use std::thread;
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use scraper::Html;
use url::Url;

use super::html::{self, HtmlTag};
use crate::errors::{FetchCause, FetchError};

/// Some advisory hosts reject the default client identifiers, so we look
/// like a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows; U; Windows NT 5.1; en-US; rv:1.9.0.7) Gecko/2009021910 Firefox/3.0.7";

/// How the [`HttpReader`] sends its requests.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Timeout of each attempt
    pub timeout: Duration,
    /// Delay before the first retry, doubled for each following one
    pub backoff_base: Duration,
    /// The User-Agent sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// The delay to wait after the given attempt (starting at 0) failed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// let config = advisory_parser::readers::http::FetchConfig::default();
    /// assert_eq!(Duration::from_secs(1), config.backoff_delay(0));
    /// assert_eq!(Duration::from_secs(4), config.backoff_delay(2));
    /// ```
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// A raw HTTP answer, whatever its status.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The status code after redirections
    pub status: u16,
    /// The body of the response
    pub body: Vec<u8>,
}

/// What went wrong before a status code could be read.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    /// The request couldn't be built from the URL, retrying is useless.
    InvalidUrl(String),
    /// The exchange failed, it may work next time.
    Connection(String),
}

/// Sends a single GET request.
pub trait HttpTransport {
    /// Sends the request and returns the response, whatever its status.
    fn get(&self, url: &str, user_agent: &str, timeout: Duration)
        -> Result<HttpResponse, TransportError>;
}

/// Waits between two attempts.
pub trait Sleeper {
    /// Blocks for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// The transport used outside of tests, a blocking reqwest client.
///
/// A client is built for every request, so no connection or cache survives
/// from one call to the next.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    /// Creates a new transport
    pub fn new() -> Self {
        ReqwestTransport
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        trace!("Running ReqwestTransport::get()");
        let parsed =
            Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;

        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::Connection(format!("Unable to create a HTTP client: {}", e)))?;

        let response = http_client
            .get(parsed.as_str())
            .header(USER_AGENT, user_agent)
            .send()
            .map_err(|e| {
                if e.is_builder() {
                    TransportError::InvalidUrl(format!("{}: {}", url, e))
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// A reader used to fetch advisory pages.
///
/// Each call is independent: no state is shared between two fetches, and
/// the backoff blocks the calling thread.
pub struct HttpReader {
    /// Sends the requests
    transport: Box<dyn HttpTransport>,
    /// Waits between attempts
    sleeper: Box<dyn Sleeper>,
    /// Retries, timeout and User-Agent
    config: FetchConfig,
}

impl HttpReader {
    /// Creates a new HttpReader with the default configuration
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    /// Creates a new HttpReader going over the network
    pub fn with_config(config: FetchConfig) -> Self {
        Self::with_transport(Box::new(ReqwestTransport::new()), Box::new(ThreadSleeper), config)
    }

    /// Creates a new HttpReader on top of the given transport and sleeper
    pub fn with_transport(
        transport: Box<dyn HttpTransport>,
        sleeper: Box<dyn Sleeper>,
        config: FetchConfig,
    ) -> Self {
        HttpReader {
            transport,
            sleeper,
            config,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches a URL with the configured retries and timeout.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_with(url, self.config.max_retries, self.config.timeout)
    }

    /// Fetches a URL, retrying server and connection errors up to
    /// `max_retries` times.
    pub fn fetch_with(
        &self,
        url: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchError> {
        trace!("Running HttpReader::fetch_with()");
        let mut attempt: u32 = 0;
        loop {
            debug!(
                "GET {} (attempt {}/{})",
                url,
                attempt.saturating_add(1),
                max_retries.saturating_add(1)
            );
            let cause = match self.transport.get(url, &self.config.user_agent, timeout) {
                Ok(response) if response.status >= 500 => FetchCause::Status(response.status),
                Ok(response) if response.status >= 400 => {
                    error!("GET {} failed with status code {}", url, response.status);
                    return Err(FetchError::ClientError {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok(response) => {
                    info!("Fetched {} ({} bytes)", url, response.body.len());
                    return Ok(response.body);
                }
                Err(TransportError::InvalidUrl(reason)) => {
                    error!("Unable to build a request: {}", reason);
                    return Err(FetchError::InvalidUrl(reason));
                }
                Err(TransportError::Connection(reason)) => FetchCause::Connection(reason),
            };

            if attempt >= max_retries {
                error!("GET {} failed after {} retries: {}", url, max_retries, cause);
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    retries: max_retries,
                    cause,
                });
            }

            let delay = self.config.backoff_delay(attempt);
            warn!("GET {} failed ({}), retrying in {:?}", url, cause, delay);
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }

    /// Fetches a page and parses it as HTML.
    pub fn get_document(&self, url: &str) -> Result<Html, FetchError> {
        let body = self.fetch(url)?;
        Ok(html::parse(&body))
    }

    /// Fetches a page and returns its visible text, one trimmed line per
    /// text line, without blank lines.
    pub fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let document = self.get_document(url)?;
        Ok(html::document_to_text(&document))
    }

    /// Fetches a page and returns the first `tag` element whose text is `text`.
    pub fn find_tag_by_text(
        &self,
        url: &str,
        tag: &str,
        text: &str,
    ) -> Result<Option<HtmlTag>, FetchError> {
        let document = self.get_document(url)?;
        Ok(html::find_tag_by_text(&document, tag, text))
    }

    /// Fetches a page and returns all the `tag` elements with the given id.
    pub fn find_tags_by_id(
        &self,
        url: &str,
        tag: &str,
        tag_id: &str,
    ) -> Result<Vec<HtmlTag>, FetchError> {
        let document = self.get_document(url)?;
        Ok(html::find_tags_by_id(&document, tag, tag_id))
    }
}

impl Default for HttpReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Test doubles for the network and the clock, shared with the parsers' tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    /// Answers with scripted responses, in order, and records the requests.
    pub struct ScriptedTransport {
        pub responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        pub requests: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
            ScriptedTransport {
                responses: RefCell::new(responses.into()),
                requests: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get(
            &self,
            url: &str,
            user_agent: &str,
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), user_agent.to_string()));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connection("script exhausted".to_string())))
        }
    }

    /// Serves fixed pages by URL, 404 for everything else.
    pub struct PagesTransport {
        pub pages: HashMap<String, String>,
    }

    impl HttpTransport for PagesTransport {
        fn get(&self, url: &str, _: &str, _: Duration) -> Result<HttpResponse, TransportError> {
            Ok(match self.pages.get(url) {
                Some(page) => ok(page),
                None => status(404),
            })
        }
    }

    /// Records the delays instead of waiting.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub delays: Rc<RefCell<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.delays.borrow_mut().push(duration);
        }
    }

    pub fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn status(code: u16) -> HttpResponse {
        HttpResponse {
            status: code,
            body: Vec::new(),
        }
    }

    /// A reader serving the given pages without waiting between attempts.
    pub fn reader_serving(pages: &[(&str, &str)]) -> HttpReader {
        let pages = pages
            .iter()
            .map(|(url, page)| (url.to_string(), page.to_string()))
            .collect();
        HttpReader::with_transport(
            Box::new(PagesTransport { pages }),
            Box::new(RecordingSleeper::default()),
            FetchConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::rc::Rc;

    const URL: &str = "https://www.example.com/advisory";

    /// Builds a reader on a script, returning the request log and the delays.
    fn scripted_reader(
        responses: Vec<Result<HttpResponse, TransportError>>,
    ) -> (
        HttpReader,
        Rc<RefCell<Vec<(String, String)>>>,
        Rc<RefCell<Vec<Duration>>>,
    ) {
        let transport = ScriptedTransport::new(responses);
        let requests = transport.requests.clone();
        let sleeper = RecordingSleeper::default();
        let delays = sleeper.delays.clone();
        let reader =
            HttpReader::with_transport(Box::new(transport), Box::new(sleeper), FetchConfig::default());
        (reader, requests, delays)
    }

    #[test]
    fn client_error_is_not_retried() {
        let (reader, requests, delays) = scripted_reader(vec![Ok(status(404)), Ok(ok("unused"))]);
        let result = reader.fetch(URL);
        assert_eq!(
            Err(FetchError::ClientError {
                url: URL.to_string(),
                status: 404
            }),
            result
        );
        assert_eq!(1, requests.borrow().len());
        assert!(delays.borrow().is_empty());
    }

    #[test]
    fn server_errors_are_retried_with_backoff() {
        let (reader, requests, delays) =
            scripted_reader(vec![Ok(status(503)), Ok(status(503)), Ok(ok("<p>advisory</p>"))]);
        let body = reader.fetch(URL).unwrap();
        assert_eq!(b"<p>advisory</p>".to_vec(), body);
        assert_eq!(3, requests.borrow().len());
        assert_eq!(
            vec![Duration::from_secs(1), Duration::from_secs(2)],
            *delays.borrow()
        );
    }

    #[test]
    fn gives_up_after_the_retry_budget() {
        let (reader, requests, delays) = scripted_reader(vec![
            Ok(status(503)),
            Ok(status(500)),
            Ok(status(502)),
            Ok(status(503)),
            Ok(ok("too late")),
        ]);
        let result = reader.fetch(URL);
        assert_eq!(
            Err(FetchError::RetriesExhausted {
                url: URL.to_string(),
                retries: 3,
                cause: FetchCause::Status(503),
            }),
            result
        );
        assert_eq!(4, requests.borrow().len());
        assert_eq!(
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ],
            *delays.borrow()
        );
    }

    #[test]
    fn connection_errors_are_retried() {
        let (reader, requests, delays) = scripted_reader(vec![
            Err(TransportError::Connection("connection refused".to_string())),
            Ok(ok("back online")),
        ]);
        assert_eq!(b"back online".to_vec(), reader.fetch(URL).unwrap());
        assert_eq!(2, requests.borrow().len());
        assert_eq!(vec![Duration::from_secs(1)], *delays.borrow());
    }

    #[test]
    fn last_connection_error_is_attached() {
        let (reader, _, _) = scripted_reader(vec![
            Ok(status(500)),
            Err(TransportError::Connection("timed out".to_string())),
        ]);
        let result = reader.fetch_with(URL, 1, Duration::from_secs(5));
        assert_eq!(
            Err(FetchError::RetriesExhausted {
                url: URL.to_string(),
                retries: 1,
                cause: FetchCause::Connection("timed out".to_string()),
            }),
            result
        );
    }

    #[test]
    fn invalid_url_is_not_retried() {
        let (reader, requests, delays) = scripted_reader(vec![Err(TransportError::InvalidUrl(
            "not a url".to_string(),
        ))]);
        assert_eq!(
            Err(FetchError::InvalidUrl("not a url".to_string())),
            reader.fetch("not a url")
        );
        assert_eq!(1, requests.borrow().len());
        assert!(delays.borrow().is_empty());
    }

    #[test]
    fn zero_retries_means_one_attempt() {
        let (reader, requests, delays) = scripted_reader(vec![Ok(status(503))]);
        assert!(reader.fetch_with(URL, 0, Duration::from_secs(1)).is_err());
        assert_eq!(1, requests.borrow().len());
        assert!(delays.borrow().is_empty());
    }

    #[test]
    fn same_user_agent_on_every_attempt() {
        let (reader, requests, _) = scripted_reader(vec![Ok(status(502)), Ok(ok(""))]);
        reader.fetch(URL).unwrap();
        for (url, user_agent) in requests.borrow().iter() {
            assert_eq!(URL, url);
            assert_eq!(DEFAULT_USER_AGENT, user_agent);
        }
    }

    #[test]
    fn redirect_statuses_are_success() {
        let (reader, _, _) = scripted_reader(vec![Ok(HttpResponse {
            status: 304,
            body: Vec::new(),
        })]);
        assert!(reader.fetch(URL).is_ok());
    }

    #[test]
    fn reqwest_transport_rejects_malformed_urls() {
        let transport = ReqwestTransport::new();
        let result = transport.get("http//missing-colon", DEFAULT_USER_AGENT, Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn huge_retry_budget_does_not_overflow() {
        log::set_max_level(log::LevelFilter::Debug);
        let (reader, requests, _) = scripted_reader(vec![Ok(ok("fine"))]);
        let body = reader.fetch_with(URL, u32::MAX, Duration::from_secs(1)).unwrap();
        assert_eq!(b"fine".to_vec(), body);
        assert_eq!(1, requests.borrow().len());
    }

    /// Answers each connection on a local port with the next raw response,
    /// and hands back the request heads received.
    fn serve(responses: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/advisory", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = BufReader::new(stream.try_clone().unwrap());
                let mut head = Vec::new();
                loop {
                    let mut line = String::new();
                    if request.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    head.push(line.trim_end().to_string());
                }
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
                heads.push(head);
            }
            heads
        });
        (url, handle)
    }

    #[test]
    fn reqwest_transport_retries_a_real_server() {
        let (url, server) = serve(vec![
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 11\r\nConnection: close\r\n\r\nback online",
        ]);
        let sleeper = RecordingSleeper::default();
        let delays = sleeper.delays.clone();
        let reader = HttpReader::with_transport(
            Box::new(ReqwestTransport::new()),
            Box::new(sleeper),
            FetchConfig::default(),
        );

        assert_eq!(b"back online".to_vec(), reader.fetch(&url).unwrap());
        assert_eq!(vec![Duration::from_secs(1)], *delays.borrow());

        let heads = server.join().unwrap();
        assert_eq!(2, heads.len());
        for head in heads {
            assert!(head[0].starts_with("GET /advisory HTTP/1.1"));
            let user_agents: Vec<&str> = head
                .iter()
                .filter_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("user-agent").then(|| value.trim())
                })
                .collect();
            assert_eq!(vec![DEFAULT_USER_AGENT], user_agents);
        }
    }

    #[test]
    fn reqwest_transport_reports_status_codes() {
        let (url, server) = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
        ]);
        let response = ReqwestTransport::new()
            .get(&url, DEFAULT_USER_AGENT, Duration::from_secs(5))
            .unwrap();
        assert_eq!(404, response.status);
        assert_eq!(b"missing".to_vec(), response.body);
        server.join().unwrap();
    }

    #[test]
    fn reqwest_transport_times_out_as_connection_error() {
        // Connections queue in the backlog but are never answered
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/advisory", listener.local_addr().unwrap());
        let result = ReqwestTransport::new().get(&url, DEFAULT_USER_AGENT, Duration::from_millis(200));
        assert!(matches!(result, Err(TransportError::Connection(_))));
        drop(listener);
    }

    #[test]
    fn helpers_work_on_fetched_pages() {
        let page = r#"<html><head><style>p { color: red; }</style>
            <script>var x = "CVE-2019-0001";</script></head>
            <body><h2 id="fix">Fixed versions</h2>
            <p>  CVE-2019-5786  </p>
            <div id="fix">second</div></body></html>"#;
        let reader = reader_serving(&[(URL, page)]);

        let text = reader.get_text(URL).unwrap();
        assert_eq!("Fixed versions\nCVE-2019-5786\nsecond", text);

        let tag = reader.find_tag_by_text(URL, "h2", "Fixed versions").unwrap();
        assert_eq!(Some("fix"), tag.as_ref().and_then(|t| t.attr("id")));

        let tags = reader.find_tags_by_id(URL, "div", "fix").unwrap();
        assert_eq!(1, tags.len());
        assert_eq!("second", tags[0].text);

        let missing = reader.get_text("https://www.example.com/missing");
        assert!(matches!(
            missing,
            Err(FetchError::ClientError { status: 404, .. })
        ));
    }
}

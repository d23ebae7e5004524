//! Drives `EntityStore` through `HttpRemote` against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port with a bearer token, then runs
//! every store operation over real HTTP using ureq on the blocking pool.

use entity_sync::{
    ApiError, ClientConfig, EntityClient, EntityDraft, EntityKind, EntityPatch, EntityStore,
    HttpExecutor, HttpMethod, HttpRemote, HttpRequest, HttpResponse, SessionAuth, StoreError,
    DEFAULT_ICON,
};

const TOKEN: &str = "integration-token";

/// Executes requests with ureq.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data, letting the client interpret them.
struct UreqExecutor;

impl HttpExecutor for UreqExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tokio::task::spawn_blocking(move || execute_blocking(request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn execute_blocking(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let result = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&req.path);
            for (k, v) in &req.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            builder.call()
        }
        HttpMethod::Delete => {
            let mut builder = agent.delete(&req.path);
            for (k, v) in &req.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            builder.call()
        }
        HttpMethod::Post | HttpMethod::Put => {
            let mut builder = if req.method == HttpMethod::Post {
                agent.post(&req.path)
            } else {
                agent.put(&req.path)
            };
            for (k, v) in &req.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            builder.send(req.body.as_deref().unwrap_or("").as_bytes())
        }
    };
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body,
    })
}

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, Some(TOKEN.to_string())).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

type HttpStore = EntityStore<HttpRemote<UreqExecutor, SessionAuth>, SessionAuth>;

fn store(base_url: &str, session: &SessionAuth) -> HttpStore {
    let client = EntityClient::from_config(&ClientConfig::new(base_url));
    let remote = HttpRemote::new(client, UreqExecutor, session.clone());
    EntityStore::new(remote, session.clone())
}

#[tokio::test]
async fn store_lifecycle_over_http() {
    let base_url = start_server();
    let session = SessionAuth::with_token(TOKEN);
    let store = store(&base_url, &session);

    // Step 1: fetch an empty collection.
    store.fetch_all().await;
    assert!(store.last_error().is_none(), "{:?}", store.last_error());
    assert!(store.entities().is_empty());

    // Step 2: build a small forest.
    let home = store
        .create(EntityDraft::new("Home", EntityKind::Expense))
        .await
        .expect("create home");
    assert_eq!(home.icon, DEFAULT_ICON);
    let rent = store
        .create(EntityDraft::new("Rent", EntityKind::Expense).with_parent(home.id.clone()))
        .await
        .expect("create rent");
    let deposit = store
        .create(EntityDraft::new("Deposit", EntityKind::Expense).with_parent(rent.id.clone()))
        .await
        .expect("create deposit");
    assert_eq!(store.entities().len(), 3);

    // Step 3: update in place.
    let renamed = store
        .update(&rent.id, EntityPatch::default().with_name("Mortgage").with_color("#EF4444"))
        .await
        .expect("update rent");
    assert_eq!(renamed.name, "Mortgage");
    let names: Vec<String> = store.entities().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Home", "Mortgage", "Deposit"]);

    // Step 4: a server-side validation error surfaces its message.
    assert!(store.create(EntityDraft::new("  ", EntityKind::Income)).await.is_none());
    assert_eq!(
        store.last_error().map(|e| e.to_string()).as_deref(),
        Some("name is required")
    );
    store.clear_error();

    // Step 5: delete the root; only its direct child is detached.
    assert!(store.delete(&home.id).await);
    assert!(store.get(&home.id).is_none());
    assert!(store.get(&rent.id).unwrap().is_root());
    assert_eq!(store.get(&deposit.id).unwrap().parent_id.as_deref(), Some(rent.id.as_str()));

    // Step 6: the server agrees with the local mirror.
    let local = store.entities();
    store.fetch_all().await;
    assert_eq!(store.entities(), local);

    // Step 7: deleting again is a 404 carrying the server's message.
    assert!(!store.delete(&home.id).await);
    assert_eq!(
        store.last_error().map(|e| e.to_string()).as_deref(),
        Some("category not found")
    );
}

#[tokio::test]
async fn signed_out_store_sends_nothing() {
    let base_url = start_server();
    let session = SessionAuth::new();
    let store = store(&base_url, &session);

    store.fetch_all().await;
    assert_eq!(store.last_error(), Some(StoreError::AuthenticationRequired));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn wrong_token_is_a_remote_failure() {
    let base_url = start_server();
    let session = SessionAuth::with_token("not-the-token");
    let store = store(&base_url, &session);

    store.fetch_all().await;
    assert_eq!(
        store.last_error().map(|e| e.to_string()).as_deref(),
        Some("missing or invalid token")
    );
}

use std::sync::Arc;

use session_liveness::{
    host::{AuthStore, Navigator, NoticeKind, Notifier, SharedAuthStore},
    Config, LivenessClient,
};

#[derive(Debug)]
struct Console;

impl Notifier for Console {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        println!("[{:?}] {}: {}", kind, title, description);
    }
}

impl Navigator for Console {
    fn redirect_to(&self, path: &str) {
        println!("-> {}", path);
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let session_id = std::env::var("LIVENESS_SESSION_ID")
        .map_err(|_| {
            println!("No LIVENESS_SESSION_ID env var or invalid");
            std::process::exit(1);
        })
        .unwrap();

    let config = Config::from_env().unwrap();
    let auth = Arc::new(SharedAuthStore::default());
    let console = Arc::new(Console);

    let handle = LivenessClient::new(config, auth.clone(), console.clone(), console)
        .unwrap()
        .start();

    auth.login(session_id);

    let mut auth_rx = auth.subscribe();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = auth_rx.wait_for(|state| !state.is_authenticated()) => {
            println!("Session ended");
        }
    }

    println!("Final status: {:?}", handle.status());
    handle.shutdown();
}

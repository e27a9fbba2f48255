//! Process identity and owner strings.

use std::thread;

/// Default process identity: `user@host:pid`.
pub fn default_process_id() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}:{}", user, host, std::process::id())
}

/// Owner string recorded on a lock: the process identity plus the calling
/// thread. Only used for diagnostics.
pub(crate) fn owner_string(process_id: &str) -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => format!("{}:{}", process_id, name),
        None => format!("{}:{:?}", process_id, current.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_process_id_has_host_and_pid() {
        let id = default_process_id();
        assert!(id.contains('@'));
        assert!(id.ends_with(&format!(":{}", std::process::id())));
    }

    #[test]
    fn owner_string_uses_thread_name() {
        let owner = thread::Builder::new()
            .name("balancer".to_string())
            .spawn(|| owner_string("node-1"))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(owner, "node-1:balancer");
    }

    #[test]
    fn owner_string_for_unnamed_thread() {
        let owner = thread::spawn(|| owner_string("node-1")).join().unwrap();
        assert!(owner.starts_with("node-1:ThreadId("));
    }
}

use std::sync::{Mutex, OnceLock};

fn default_status() -> String {
    #[cfg(target_os = "linux")]
    {
        "VR: idle (runtime not started)".to_string()
    }
    #[cfg(not(target_os = "linux"))]
    {
        "VR: not available on this platform".to_string()
    }
}

static RUNTIME_STATUS: OnceLock<Mutex<String>> = OnceLock::new();

fn status_cell() -> &'static Mutex<String> {
    RUNTIME_STATUS.get_or_init(|| Mutex::new(default_status()))
}

pub fn runtime_status() -> String {
    match status_cell().lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn set_runtime_status(status: impl Into<String>) {
    let mut guard = match status_cell().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = status.into();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        set_runtime_status("VR: testing");
        assert_eq!(runtime_status(), "VR: testing");
        set_runtime_status(String::from("VR: stopped"));
        assert_eq!(runtime_status(), "VR: stopped");
    }
}

use anyhow::Result;
use log::{error, info, warn};
use notify::{RecursiveMode, Watcher};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::{
    io::{BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    sync::atomic::Ordering,
    sync::mpsc,
    thread,
    time::Duration,
};

use super::pipeline::{PipelineControls, run_pipeline};
use super::runtime::socket_path;
use crate::config::DaemonConfigState;

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path();
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut state = DaemonState::new()?;
    info!("daemon: active profile '{}'", state.cfg.active_name);

    // pipeline thread (detector -> engine -> uinput)
    let controls = PipelineControls::new(state.cfg.profile.clone());
    {
        let ctl = controls.clone();
        thread::spawn(move || {
            if let Err(e) = run_pipeline(ctl) {
                error!("gesture pipeline failed: {e:#}");
            }
        });
    }

    // requests from client handlers back to this loop
    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();

    // SIGINT/SIGTERM -> clean shutdown
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    {
        let tx = tx_req.clone();
        thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                warn!("received signal {sig}, shutting down");
                let _ = tx.send(IpcMsg::Shutdown);
            }
        });
    }

    // hot-reload: watch the profiles directory for edits to the active one
    let (tx_fs, rx_fs) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx_fs.send(res);
    })?;
    watcher.watch(&state.cfg.profiles_dir, RecursiveMode::NonRecursive)?;

    listener.set_nonblocking(true)?;
    loop {
        if let Ok((stream, _)) = listener.accept() {
            let tx = tx_req.clone();
            let snapshot = state.clone_shallow();
            let enabled = controls.enabled.load(Ordering::Relaxed);
            thread::spawn(move || {
                if let Err(e) = handle_client(stream, snapshot, enabled, tx) {
                    error!("ipc client error: {e}");
                }
            });
        }

        while let Ok(Ok(event)) = rx_fs.try_recv() {
            let active = format!("{}.toml", state.cfg.active_name);
            let touches_active = event
                .paths
                .iter()
                .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(active.as_str()));
            if touches_active && (event.kind.is_modify() || event.kind.is_create()) {
                info!("active profile changed on disk, reloading");
                let _ = tx_req.send(IpcMsg::Reload);
            }
        }

        while let Ok(msg) = rx_req.try_recv() {
            match msg {
                IpcMsg::Reload => match state.cfg.reload() {
                    Ok(()) => {
                        controls.swap_profile(state.cfg.profile.clone());
                        info!("profile reloaded");
                    }
                    Err(e) => error!("reload failed, keeping last good profile: {e:#}"),
                },
                IpcMsg::UseProfile(name) => match state.cfg.set_active(&name) {
                    Ok(()) => {
                        controls.swap_profile(state.cfg.profile.clone());
                        info!("switched active profile to {}", state.cfg.active_name);
                    }
                    Err(e) => error!("use profile failed: {e:#}"),
                },
                IpcMsg::SetEnabled(en) => {
                    controls.enabled.store(en, Ordering::Relaxed);
                    info!("input injection {}", if en { "enabled" } else { "disabled" });
                }
                IpcMsg::Shutdown => {
                    let _ = std::fs::remove_file(&sock);
                    info!("daemon: shut down");
                    return Ok(());
                }
            }
        }

        thread::sleep(Duration::from_millis(5));
    }
}

fn handle_client(
    mut stream: UnixStream,
    st: DaemonState,
    enabled: bool,
    tx_req: mpsc::Sender<IpcMsg>,
) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: serde_json::Value = serde_json::from_str(&line)?;
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");

    let resp = match op {
        "status" => serde_json::json!({"ok": true, "data": {
            "enabled": enabled,
            "active_profile": st.cfg.active_name,
            "socket": socket_path(),
            "detector_command": st.cfg.profile.detector.command,
        }}),
        "reload" => {
            let _ = tx_req.send(IpcMsg::Reload);
            serde_json::json!({"ok": true, "data": {"active_profile": st.cfg.active_name}})
        }
        "use" => {
            let name = req.get("profile").and_then(|v| v.as_str()).unwrap_or("");
            let _ = tx_req.send(IpcMsg::UseProfile(name.to_string()));
            serde_json::json!({"ok": true, "data": {"active_profile": name}})
        }
        "list" => {
            let list = st.cfg.list_profiles();
            serde_json::json!({"ok": true, "data": {"profiles": list, "active": st.cfg.active_name}})
        }
        "doctor" => {
            let report = st.cfg.doctor_report();
            serde_json::json!({"ok": true, "data": report})
        }
        "enable" => {
            let _ = tx_req.send(IpcMsg::SetEnabled(true));
            serde_json::json!({"ok": true, "data": {"enabled": true}})
        }
        "disable" => {
            let _ = tx_req.send(IpcMsg::SetEnabled(false));
            serde_json::json!({"ok": true, "data": {"enabled": false}})
        }
        "shutdown" => {
            let _ = tx_req.send(IpcMsg::Shutdown);
            serde_json::json!({"ok": true, "data": "shutting down"})
        }
        _ => serde_json::json!({"ok": false, "error": format!("unknown op: {op}")}),
    };

    writeln!(stream, "{resp}")?;
    Ok(())
}

struct DaemonState {
    pub cfg: DaemonConfigState,
}

impl DaemonState {
    fn new() -> Result<Self> {
        let cfg = DaemonConfigState::load_or_install_default()?;
        Ok(Self { cfg })
    }
    fn clone_shallow(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
        }
    }
}

enum IpcMsg {
    Reload,
    UseProfile(String),
    SetEnabled(bool),
    Shutdown,
}

// client helper
pub fn client_request(req: serde_json::Value) -> Result<serde_json::Value> {
    let sock = socket_path();
    if !sock.exists() {
        return Err(anyhow::anyhow!(
            "handctl daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: serde_json::Value = serde_json::from_str(&resp)?;
    Ok(v)
}

#![forbid(unsafe_code)]

#[cfg(unix)]
mod unix {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::fs;
    use std::io;
    use std::path::Path;
    use std::process::{Child, Command, Output, Stdio};
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    const SCRIPT: &str = r#"
[[links]]
src = 1
src_port = 7
dst = 2
dst_port = 1

[[events]]
kind = "switch_connected"
switch = 1

[[events]]
kind = "switch_connected"
switch = 2

[[events]]
kind = "sleep"
millis = 300

[[events]]
kind = "packet_in"
switch = 2
in_port = 4
src = "02:00:00:00:00:0b"
dst = "ff:ff:ff:ff:ff:ff"

[[events]]
kind = "packet_in"
switch = 1
in_port = 3
src = "02:00:00:00:00:0a"
dst = "02:00:00:00:00:0b"
"#;

    #[test]
    fn script_runs_to_completion() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path, 0.2)?;
        let script_path = dir.path().join("script.toml");
        fs::write(&script_path, SCRIPT)?;

        let child = Command::new(env!("CARGO_BIN_EXE_qflow"))
            .arg("--config")
            .arg(&config_path)
            .arg("--script")
            .arg(&script_path)
            .arg("--linger-ms")
            .arg("200")
            .arg("-v")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let output = wait_for_output(child)?;
        assert!(output.status.success());

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        assert!(combined.contains("topology rebuilt"));
        assert!(combined.contains("flow installed"));
        assert!(combined.contains("packet out"));
        assert!(combined.contains("script exhausted"));
        assert!(combined.contains("final status"));

        Ok(())
    }

    #[test]
    fn signals_trigger_dump_reload_and_shutdown() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path, 0.2)?;
        let script_path = dir.path().join("script.toml");
        fs::write(
            &script_path,
            "[[events]]\nkind = \"switch_connected\"\nswitch = 1\n\n\
[[events]]\nkind = \"sleep\"\nmillis = 30000\n",
        )?;

        let child = Command::new(env!("CARGO_BIN_EXE_qflow"))
            .arg("--config")
            .arg(&config_path)
            .arg("--script")
            .arg(&script_path)
            .arg("-v")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = Pid::from_raw(child.id() as i32);
        sleep(Duration::from_millis(400));

        kill(pid, Signal::SIGUSR1).ok();
        sleep(Duration::from_millis(400));

        write_config(&config_path, 0.0)?;
        kill(pid, Signal::SIGHUP).ok();
        sleep(Duration::from_millis(400));

        kill(pid, Signal::SIGUSR1).ok();
        sleep(Duration::from_millis(400));

        kill(pid, Signal::SIGINT).ok();
        let output = wait_for_output(child)?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        assert!(combined.contains("state summary"));
        assert!(combined.contains("config reloaded"));
        assert!(combined.contains("shutdown requested"));
        assert!(combined.contains("final status"));
        assert!(combined.matches("current config").count() >= 2);

        Ok(())
    }

    fn write_config(path: &Path, epsilon: f64) -> io::Result<()> {
        let contents = format!(
            "[learning]\nalpha = 0.5\ngamma = 0.9\nepsilon = {epsilon}\n\n\
[monitor]\npoll_interval = 1\n\n\
[topology]\nbootstrap_delay = 0\ndebounce = 50\n"
        );
        fs::write(path, contents)
    }

    fn wait_for_output(mut child: Child) -> io::Result<Output> {
        let start = Instant::now();
        loop {
            if child.try_wait()?.is_some() {
                break;
            }
            if start.elapsed() > Duration::from_secs(10) {
                let _ = child.kill();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "qflow process did not exit",
                ));
            }
            sleep(Duration::from_millis(50));
        }
        child.wait_with_output()
    }
}

#[cfg(not(unix))]
#[test]
fn signals_trigger_dump_reload_and_shutdown() {
    // Signals are only supported in the Unix build.
}

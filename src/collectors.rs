//! Probes and host collectors.
//!
//! Every collector here degrades to an empty or `Unreachable` result. Nothing
//! propagates an error to the phase that called it. Parsing is split out into
//! pure functions so it can be tested without the tools installed.

use crate::domain::documents::{DockerContainer, ListeningPort, Pm2Process, ProcessHealth, SystemLoad};
use crate::services::task::{run_command, TaskError};
use std::time::Duration;

const TOP_CONSUMERS: usize = 5;
const PS_COMMAND_COLUMN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 2xx.
    Reachable { status: u16 },
    /// The collaborator answered with a non-2xx status.
    HttpError { status: u16, reason: String },
    /// Connection refused, DNS failure, timeout, bad URL.
    Unreachable { reason: String },
}

pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

pub fn probe_http(client: &reqwest::blocking::Client, url: &str) -> ProbeOutcome {
    match client.get(url).send() {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                ProbeOutcome::Reachable {
                    status: status.as_u16(),
                }
            } else {
                ProbeOutcome::HttpError {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                }
            }
        }
        Err(e) => ProbeOutcome::Unreachable {
            reason: e.to_string(),
        },
    }
}

fn stdout_of(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    match run_command(program, args, timeout).into_result(program, timeout) {
        Ok(out) => Some(out.stdout),
        Err(e @ TaskError::TimedOut { .. }) => {
            log::warn!("{}", e);
            None
        }
        Err(e) => {
            log::debug!("{}", e);
            None
        }
    }
}

pub fn docker_containers(timeout: Duration) -> Vec<DockerContainer> {
    stdout_of(
        "docker",
        &[
            "ps",
            "-a",
            "--format",
            "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.Status}}\t{{.Ports}}",
        ],
        timeout,
    )
    .map(|s| parse_docker_ps(&s))
    .unwrap_or_default()
}

pub fn pm2_processes(timeout: Duration) -> Vec<Pm2Process> {
    stdout_of("pm2", &["jlist"], timeout)
        .map(|s| parse_pm2_jlist(&s))
        .unwrap_or_default()
}

pub fn listening_ports(timeout: Duration) -> Vec<ListeningPort> {
    if let Some(out) = stdout_of("ss", &["-tulpn"], timeout) {
        return parse_listening(&out, 4);
    }
    stdout_of("netstat", &["-tulpn"], timeout)
        .map(|s| parse_listening(&s, 3))
        .unwrap_or_default()
}

/// Load averages from `uptime`, falling back to `/proc/loadavg`. `status` is
/// left empty for the caller to classify; `unknown` when nothing was readable.
pub fn system_load(timeout: Duration) -> SystemLoad {
    if let Some(out) = stdout_of("uptime", &[], timeout) {
        if let Some(load) = parse_uptime(&out) {
            return load;
        }
    }
    if let Ok(raw) = std::fs::read_to_string("/proc/loadavg") {
        if let Some(load) = parse_proc_loadavg(&raw) {
            return load;
        }
    }
    SystemLoad {
        status: "unknown".to_string(),
        ..SystemLoad::default()
    }
}

pub fn process_health(timeout: Duration, deadlock_zombies: usize) -> ProcessHealth {
    let top = |sort: &str| {
        stdout_of("ps", &["aux", sort], timeout)
            .map(|s| top_commands(&s, TOP_CONSUMERS))
            .unwrap_or_default()
    };
    let zombie_processes = stdout_of("ps", &["aux"], timeout)
        .map(|s| count_zombies(&s))
        .unwrap_or(0);
    ProcessHealth {
        top_cpu_consumers: top("--sort=-%cpu"),
        top_memory_consumers: top("--sort=-%mem"),
        zombie_processes,
        deadlock_detected: zombie_processes > deadlock_zombies,
    }
}

/// First line of `<tool> --version`, or `None` when the tool is unusable.
pub fn tool_version(tool: &str, timeout: Duration) -> Option<String> {
    stdout_of(tool, &["--version"], timeout).map(|s| s.lines().next().unwrap_or("").trim().to_string())
}

pub fn parse_docker_ps(stdout: &str) -> Vec<DockerContainer> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 4 {
                return None;
            }
            Some(DockerContainer {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                image: parts[2].to_string(),
                status: parts[3].to_string(),
                ports: parts.get(4).unwrap_or(&"").to_string(),
            })
        })
        .collect()
}

pub fn parse_pm2_jlist(stdout: &str) -> Vec<Pm2Process> {
    let list: Vec<serde_json::Value> = match serde_json::from_str(stdout.trim()) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("pm2 jlist output is not a JSON list: {}", e);
            return vec![];
        }
    };
    list.iter()
        .map(|p| {
            let env = &p["pm2_env"];
            let monit = &p["monit"];
            let text = |v: &serde_json::Value, default: &str| {
                v.as_str().unwrap_or(default).to_string()
            };
            Pm2Process {
                name: text(&p["name"], "unknown"),
                pm_id: p["pm_id"].as_i64().unwrap_or(-1),
                status: text(&env["status"], "unknown"),
                pid: p["pid"].as_i64().unwrap_or(0),
                cpu: monit["cpu"].as_f64().unwrap_or(0.0),
                memory: monit["memory"].as_u64().unwrap_or(0),
                cwd: text(&env["pm_cwd"], ""),
                script: text(&env["pm_exec_path"], ""),
            }
        })
        .collect()
}

/// Keeps `LISTEN` rows. `addr_col` is the local-address column: 4 for `ss`,
/// 3 for `netstat`.
pub fn parse_listening(stdout: &str, addr_col: usize) -> Vec<ListeningPort> {
    stdout
        .lines()
        .filter(|l| l.contains("LISTEN"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let local = parts.get(addr_col)?;
            let (_, port) = local.rsplit_once(':')?;
            Some(ListeningPort {
                port: port.to_string(),
                address: local.to_string(),
                protocol: parts[0].to_string(),
                raw: line.trim().to_string(),
            })
        })
        .collect()
}

fn loads_from(text: &str) -> Option<[f64; 3]> {
    let vals: Vec<f64> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .take(3)
        .collect();
    if vals.is_empty() {
        return None;
    }
    let at = |i: usize| vals.get(i).copied().unwrap_or(0.0);
    Some([at(0), at(1), at(2)])
}

pub fn parse_uptime(stdout: &str) -> Option<SystemLoad> {
    let (_, tail) = stdout.split_once("load average")?;
    let tail = tail.trim_start_matches('s').trim_start_matches(':');
    let [a, b, c] = loads_from(tail)?;
    Some(SystemLoad {
        load_1min: a,
        load_5min: b,
        load_15min: c,
        status: String::new(),
        raw: stdout.trim().to_string(),
    })
}

pub fn parse_proc_loadavg(raw: &str) -> Option<SystemLoad> {
    let head: String = raw.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    let [a, b, c] = loads_from(&head)?;
    Some(SystemLoad {
        load_1min: a,
        load_5min: b,
        load_15min: c,
        status: String::new(),
        raw: raw.trim().to_string(),
    })
}

/// Command column of the first `n` data rows of `ps aux`.
pub fn top_commands(stdout: &str, n: usize) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .take(n)
        .filter_map(|l| l.split_whitespace().nth(PS_COMMAND_COLUMN).map(str::to_string))
        .collect()
}

pub fn count_zombies(stdout: &str) -> usize {
    stdout.matches("<defunct>").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_rows_need_four_fields() {
        let out = "abc123\tnexus-backend\tnexus/backend:1\tUp 3 hours\t0.0.0.0:3000->3000/tcp\n\
                   def456\told-worker\tworker:2\tExited (0) 2 days ago\n\
                   broken\trow\n";
        let rows = parse_docker_ps(out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "nexus-backend");
        assert_eq!(rows[0].ports, "0.0.0.0:3000->3000/tcp");
        assert_eq!(rows[1].status, "Exited (0) 2 days ago");
        assert_eq!(rows[1].ports, "");
    }

    #[test]
    fn pm2_jlist_fields_are_lifted() {
        let out = r#"[{"name":"backend-api","pm_id":0,"pid":4242,
            "monit":{"cpu":1.5,"memory":52428800},
            "pm2_env":{"status":"online","pm_cwd":"/srv/app","pm_exec_path":"/srv/app/server.js"}},
            {"pm2_env":{}}]"#;
        let procs = parse_pm2_jlist(out);
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0].status, "online");
        assert_eq!(procs[0].memory, 52428800);
        assert_eq!(procs[0].script, "/srv/app/server.js");
        assert_eq!(procs[1].name, "unknown");
        assert_eq!(procs[1].pm_id, -1);
        assert_eq!(procs[1].status, "unknown");
    }

    #[test]
    fn pm2_garbage_is_empty() {
        assert!(parse_pm2_jlist("[PM2] Spawning daemon").is_empty());
    }

    #[test]
    fn ss_and_netstat_columns_differ() {
        let ss = "Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process\n\
                  tcp   LISTEN 0      511    0.0.0.0:3000      0.0.0.0:*         users:((\"node\",pid=1,fd=20))\n\
                  udp   UNCONN 0      0      0.0.0.0:68        0.0.0.0:*\n";
        let rows = parse_listening(ss, 4);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].port, "3000");
        assert_eq!(rows[0].address, "0.0.0.0:3000");
        assert_eq!(rows[0].protocol, "tcp");

        let netstat = "tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN      88/postgres\n";
        let rows = parse_listening(netstat, 3);
        assert_eq!(rows[0].port, "5432");
        assert_eq!(rows[0].address, "127.0.0.1:5432");
    }

    #[test]
    fn uptime_load_is_parsed_on_linux_and_bsd() {
        let linux = " 10:01:02 up 3 days,  2:03,  1 user,  load average: 0.52, 0.58, 0.59\n";
        let l = parse_uptime(linux).unwrap();
        assert_eq!((l.load_1min, l.load_5min, l.load_15min), (0.52, 0.58, 0.59));
        assert!(l.status.is_empty());

        let bsd = "10:01  up 3 days, 2 users, load averages: 1.20 1.10 1.00";
        let b = parse_uptime(bsd).unwrap();
        assert_eq!(b.load_1min, 1.2);
        assert_eq!(b.load_15min, 1.0);

        assert!(parse_uptime("up 3 days").is_none());
    }

    #[test]
    fn proc_loadavg_is_parsed() {
        let l = parse_proc_loadavg("21.50 12.00 3.25 2/512 9999\n").unwrap();
        assert_eq!(l.load_1min, 21.5);
        assert_eq!(l.load_15min, 3.25);
    }

    #[test]
    fn ps_rows_yield_command_column_and_zombies() {
        let ps = "USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND\n\
                  root 1 9.0 0.1 1000 200 ? Ss 10:00 0:01 node server.js\n\
                  root 2 5.0 0.1 1000 200 ? Z 10:00 0:00 [sh] <defunct>\n\
                  root 3 1.0 0.1 1000 200 ? Z 10:00 0:00 [sh] <defunct>\n";
        assert_eq!(top_commands(ps, 5), vec!["node", "[sh]", "[sh]"]);
        assert_eq!(top_commands(ps, 1), vec!["node"]);
        assert_eq!(count_zombies(ps), 2);
    }

    #[test]
    fn unreachable_probe_is_typed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = http_client(Duration::from_secs(2)).unwrap();
        let out = probe_http(&client, &format!("http://127.0.0.1:{}/health", port));
        assert!(matches!(out, ProbeOutcome::Unreachable { .. }));
    }
}

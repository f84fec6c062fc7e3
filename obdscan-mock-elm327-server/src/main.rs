//! Mock ELM327 OBD2 adapter for testing obdscan without hardware.
//!
//! Serves the ELM327 wire protocol over TCP: per-connection AT state
//! (echo, linefeeds, spaces, reset), prompt-terminated replies,
//! chained supported-PID bitmaps, a ramping RPM, trouble codes, and a
//! multi-line VIN.
//!
//! Usage: cargo run -p obdscan-mock-elm327-server
//! Then: obdscan --tcp 127.0.0.1:35000 pids

use clap::Parser;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "obdscan-mock-elm327")]
#[command(about = "Mock ELM327 adapter over TCP")]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:35000")]
    listen: String,

    /// Report UNABLE TO CONNECT for every OBD request, as an adapter
    /// with no vehicle on the bus does.
    #[arg(long)]
    no_vehicle: bool,
}

fn main() {
    let args = Args::parse();

    println!("Mock ELM327 starting on {}...", args.listen);
    let listener = TcpListener::bind(&args.listen).expect("Failed to bind");
    println!("Mock ELM327 ready - waiting for connections...");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                println!("Client connected: {:?}", stream.peer_addr());
                let no_vehicle = args.no_vehicle;
                std::thread::spawn(move || handle_client(stream, no_vehicle));
            }
            Err(e) => eprintln!("Connection error: {e}"),
        }
    }
}

/// Per-connection adapter settings driven by AT commands.
struct AdapterState {
    echo_enabled: bool,
    linefeeds_enabled: bool,
    spaces_enabled: bool,
}

impl Default for AdapterState {
    fn default() -> Self {
        Self {
            echo_enabled: true,
            linefeeds_enabled: true,
            spaces_enabled: true,
        }
    }
}

impl AdapterState {
    fn line_ending(&self) -> &'static str {
        if self.linefeeds_enabled {
            "\r\n"
        } else {
            "\r"
        }
    }

    /// Wrap response text the way the adapter frames replies.
    fn frame(&self, text: &str) -> String {
        let le = self.line_ending();
        format!("{text}{le}{le}>")
    }

    /// Insert a space between hex byte pairs when spaces are enabled.
    fn format_payload(&self, payload: &str) -> String {
        if !self.spaces_enabled {
            return payload.to_string();
        }
        let mut result = String::with_capacity(payload.len() * 3 / 2);
        let mut hex_count = 0;
        for ch in payload.chars() {
            if ch.is_ascii_hexdigit() {
                if hex_count > 0 && hex_count % 2 == 0 {
                    result.push(' ');
                }
                hex_count += 1;
            } else {
                hex_count = 0;
            }
            result.push(ch);
        }
        result
    }

    /// Handle an AT command (spaces already stripped) and produce the
    /// framed reply.
    fn handle_at_command(&mut self, cmd: &str) -> String {
        let reply = match cmd {
            "ATZ" => {
                *self = AdapterState::default();
                "ELM327 v1.5"
            }
            "ATE0" => {
                self.echo_enabled = false;
                "OK"
            }
            "ATE1" => {
                self.echo_enabled = true;
                "OK"
            }
            "ATL0" => {
                self.linefeeds_enabled = false;
                "OK"
            }
            "ATL1" => {
                self.linefeeds_enabled = true;
                "OK"
            }
            "ATS0" => {
                self.spaces_enabled = false;
                "OK"
            }
            "ATS1" => {
                self.spaces_enabled = true;
                "OK"
            }
            "ATI" => "ELM327 v1.5",
            "AT@1" => "Mock ELM327",
            "AT@2" => "?",
            "ATDP" => "AUTO, ISO 9141-2",
            "ATRV" => "12.6V",
            "ATCS" => "T:OK R:OK",
            "ATKW" => "KW1:E9 KW2:8F",
            "ATBD" => "00",
            "ATPPS" => "FF",
            _ if cmd.starts_with("ATSP") => "OK",
            _ if cmd.starts_with("ATIB") => "OK",
            _ if cmd.starts_with("ATST") => "OK",
            _ if cmd.starts_with("ATAT") => "OK",
            _ => "?",
        };
        self.frame(reply)
    }
}

/// Ramp RPM between idle and redline so clients see changing data.
fn rpm_raw_value(start_time: &Instant) -> u32 {
    const MIN_RPM: f32 = 800.0;
    const MAX_RPM: f32 = 3500.0;
    const RAMP_TIME: f32 = 4.0;
    const HOLD_TIME: f32 = 3.0;
    const CYCLE_TIME: f32 = 2.0 * (RAMP_TIME + HOLD_TIME);

    let elapsed = start_time.elapsed().as_secs_f32();
    let phase = elapsed % CYCLE_TIME;

    let rpm = if phase < RAMP_TIME {
        MIN_RPM + (MAX_RPM - MIN_RPM) * (phase / RAMP_TIME)
    } else if phase < RAMP_TIME + HOLD_TIME {
        MAX_RPM
    } else if phase < 2.0 * RAMP_TIME + HOLD_TIME {
        let ramp_phase = phase - RAMP_TIME - HOLD_TIME;
        MAX_RPM - (MAX_RPM - MIN_RPM) * (ramp_phase / RAMP_TIME)
    } else {
        MIN_RPM
    };

    (rpm * 4.0) as u32
}

/// Canned reply payload for one OBD request, or None for NO DATA.
fn obd_response(cmd: &str, start_time: &Instant) -> Option<String> {
    let payload = match cmd {
        // Supported-PID bitmaps; 0120's low bit chains into 0140.
        "0100" => "4100BE3FA813".to_string(),
        "0120" => "412080000001".to_string(),
        "0140" => "4140FED08000".to_string(),
        // Monitor status: MIL off, spark ignition, continuous tests
        // passed, a few non-continuous tests enabled.
        "0101" => "410100076504".to_string(),
        "0103" => "41030102".to_string(),
        "0104" => "410464".to_string(),
        "0105" => "41054F".to_string(),
        "0106" => "410685".to_string(),
        "0107" => "41077E".to_string(),
        "010C" => format!("410C{:04X}", rpm_raw_value(start_time)),
        "010D" => "410D28".to_string(),
        "010E" => "410E90".to_string(),
        "010F" => "410F38".to_string(),
        "0110" => "41100190".to_string(),
        "0111" => "411145".to_string(),
        "0113" => "411303".to_string(),
        "0115" => "41156680".to_string(),
        "011C" => "411C03".to_string(),
        "011F" => "411F0042".to_string(),
        "0121" => "41210000".to_string(),
        // Stored and pending trouble codes, zero-padded.
        "03" => "4301330000".to_string(),
        "07" => "47030100000000".to_string(),
        "04" => "44".to_string(),
        // Mode 05 is not available over CAN.
        "050100" => return None,
        // Mode 09: VIN and ECU name supported.
        "0900" => "49000140400000".to_string(),
        "0901" => "490102".to_string(),
        "0902" => "49020100574442\r49020231323334".to_string(),
        "090A" => "490A014543550031".to_string(),
        _ => return None,
    };
    Some(payload)
}

fn process_command(
    cmd: &str,
    start_time: &Instant,
    state: &mut AdapterState,
    no_vehicle: bool,
) -> String {
    // Adapters ignore spaces and case in commands.
    let cmd = cmd.replace(' ', "").to_uppercase();

    if cmd.starts_with("AT") {
        return state.handle_at_command(&cmd);
    }

    if no_vehicle {
        return state.frame("UNABLE TO CONNECT");
    }

    match obd_response(&cmd, start_time) {
        Some(payload) => {
            let formatted = state.format_payload(&payload);
            state.frame(&formatted)
        }
        None => state.frame("NO DATA"),
    }
}

fn handle_client(mut stream: TcpStream, no_vehicle: bool) {
    let mut buffer = Vec::new();
    let mut byte = [0u8; 1];
    let start_time = Instant::now();
    let mut state = AdapterState::default();

    loop {
        match stream.read(&mut byte) {
            Ok(0) => {
                println!("Client disconnected");
                break;
            }
            Ok(_) => {
                let ch = byte[0];

                // Echo character if enabled
                if state.echo_enabled && stream.write_all(&byte).is_err() {
                    break;
                }

                // Carriage return terminates command
                if ch == b'\r' {
                    let command = String::from_utf8_lossy(&buffer).trim().to_string();

                    if !command.is_empty() {
                        println!("RX: {command}");
                        let response = process_command(&command, &start_time, &mut state, no_vehicle);
                        println!("TX: {}", response.escape_debug());

                        if let Err(e) = stream.write_all(response.as_bytes()) {
                            eprintln!("Write error: {e}");
                            break;
                        }
                    }

                    buffer.clear();
                } else if ch != b'\n' {
                    // Accumulate command (ignore linefeeds)
                    buffer.push(ch);
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults() {
        let mut state = AdapterState::default();
        state.handle_at_command("ATE0");
        state.handle_at_command("ATS0");
        assert!(!state.echo_enabled);
        assert!(!state.spaces_enabled);
        let reply = state.handle_at_command("ATZ");
        assert!(reply.contains("ELM327"));
        assert!(state.echo_enabled);
        assert!(state.spaces_enabled);
    }

    #[test]
    fn spaces_split_hex_pairs_only_when_enabled() {
        let mut state = AdapterState::default();
        assert_eq!(state.format_payload("410C1AF8"), "41 0C 1A F8");
        state.handle_at_command("ATS0");
        assert_eq!(state.format_payload("410C1AF8"), "410C1AF8");
    }

    #[test]
    fn init_sequence_with_spaces_in_commands() {
        let mut state = AdapterState::default();
        let start = Instant::now();
        let reply = process_command("AT E0", &start, &mut state, false);
        assert_eq!(reply, "OK\r\n\r\n>");
        assert!(!state.echo_enabled);
        let reply = process_command("AT SP A3", &start, &mut state, false);
        assert!(reply.starts_with("OK"));
        let reply = process_command("AT IB 10", &start, &mut state, false);
        assert!(reply.starts_with("OK"));
    }

    #[test]
    fn bitmap_chain_is_consistent() {
        // 0100 flags PID 20, 0120 flags PID 40, 0140 ends the chain.
        let start = Instant::now();
        let mut state = AdapterState::default();
        state.handle_at_command("ATS0");
        for cmd in ["0100", "0120", "0140"] {
            let reply = process_command(cmd, &start, &mut state, false);
            assert!(reply.starts_with(&format!("41{}", &cmd[2..])), "{reply}");
        }
    }

    #[test]
    fn no_vehicle_reports_unable_to_connect() {
        let start = Instant::now();
        let mut state = AdapterState::default();
        let reply = process_command("0100", &start, &mut state, true);
        assert!(reply.contains("UNABLE TO CONNECT"));
        // AT commands still work without a vehicle.
        let reply = process_command("ATI", &start, &mut state, true);
        assert!(reply.contains("ELM327"));
    }

    #[test]
    fn unknown_pid_yields_no_data() {
        let start = Instant::now();
        let mut state = AdapterState::default();
        state.handle_at_command("ATS0");
        let reply = process_command("015D", &start, &mut state, false);
        assert!(reply.contains("NO DATA"));
    }

    #[test]
    fn rpm_stays_within_the_ramp_band() {
        let raw = rpm_raw_value(&Instant::now());
        let rpm = raw / 4;
        assert!((800..=3500).contains(&rpm));
    }
}

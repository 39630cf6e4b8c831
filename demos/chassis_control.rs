use std::net::{SocketAddr, ToSocketAddrs};

use ipmi_lan::protocol::RMCP_PORT;
use ipmi_lan::transport::blocking::UdpTransport;
use ipmi_lan::{ChassisControl, Client};

fn resolve(host: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    if let Ok(addr) = host.parse() {
        return Ok(addr);
    }
    let with_port = if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{RMCP_PORT}")
    };
    with_port
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("cannot resolve {host}").into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example chassis_control -- 192.168.1.10 password cycle
    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("missing <host[:port]>")?;
    let password = args.next().ok_or("missing <password>")?;
    let action = args.next().ok_or("missing <action>")?;

    let control = match action.to_ascii_lowercase().as_str() {
        "on" | "up" => ChassisControl::PowerUp,
        "off" | "down" => ChassisControl::PowerDown,
        "cycle" => ChassisControl::PowerCycle,
        "reset" => ChassisControl::HardReset,
        "diag" => ChassisControl::PulseDiagnosticInterrupt,
        "soft" | "acpi" => ChassisControl::SoftShutdown,
        _ => return Err("invalid action (on|off|cycle|reset|diag|soft)".into()),
    };

    let transport = UdpTransport::connect(resolve(&host)?)?;
    let mut client = Client::builder().password(password).build(transport)?;

    client.submit(control);
    client.run_until_idle()?;
    println!("Chassis control command sent: {control}");

    Ok(())
}

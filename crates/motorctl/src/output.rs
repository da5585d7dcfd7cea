//! Output formatting for CLI responses

use anyhow::Error;
use colored::Colorize;
use motorlink_engine::LoopSummary;
use motorlink_protocol::{DeviceProfile, Encoding, ProfileCatalog};
use motorlink_recorder::Reading;
use motorlink_transport::{UsbDeviceInfo, UsbOptions};
use serde_json::json;

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, exit_code: u8) {
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "exit_code": exit_code,
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_devices(devices: &[UsbDeviceInfo], options: &UsbOptions, json: bool) {
    if json {
        let devices: Vec<_> = devices
            .iter()
            .map(|d| {
                json!({
                    "vendor_id": format!("0x{:04X}", d.vendor_id),
                    "product_id": format!("0x{:04X}", d.product_id),
                    "manufacturer": d.manufacturer,
                    "product": d.product,
                    "serial": d.serial,
                    "supported": d.matches(options),
                })
            })
            .collect();
        print_json(&json!({ "success": true, "devices": devices }));
        return;
    }

    if devices.is_empty() {
        println!("{}", "No USB devices found".yellow());
        return;
    }
    println!("{}", "USB devices:".bold());
    for device in devices {
        let line = render_device(device);
        if device.matches(options) {
            println!("  {} {}", "*".green().bold(), line.green());
        } else {
            println!("    {line}");
        }
    }
}

pub fn render_device(device: &UsbDeviceInfo) -> String {
    let mut line = format!("{:04X}:{:04X}", device.vendor_id, device.product_id);
    let name: Vec<&str> = [device.manufacturer.as_deref(), device.product.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !name.is_empty() {
        line.push_str(&format!(" {}", name.join(" ")));
    }
    if let Some(serial) = &device.serial {
        line.push_str(&format!(" [{serial}]"));
    }
    line
}

/// Channel and parameter table of one profile.
pub fn render_profile(profile: &DeviceProfile) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}: {}\n", profile.name, profile.description));
    out.push_str(&format!(
        "  {:<16} {:>7} {:>6} {:>3}  {:<8} {:>14} {:>9}\n",
        "channel", "request", "value", "len", "encoding", "factor", "offset"
    ));
    for ch in &profile.channels {
        let encoding = match ch.encoding {
            Encoding::Unsigned => "unsigned",
            Encoding::Signed => "signed",
        };
        let name = if ch.hidden {
            format!("({})", ch.name)
        } else {
            ch.name.clone()
        };
        out.push_str(&format!(
            "  {:<16} {:>7} {:>6} {:>3}  {:<8} {:>14.6e} {:>9}\n",
            name,
            ch.request.to_string(),
            format!("0x{:04X}", ch.value),
            ch.length,
            encoding,
            ch.scale.factor(),
            ch.scale.offset
        ));
    }
    for field in &profile.derived {
        out.push_str(&format!(
            "  {:<16} derived from {}\n",
            field.name(),
            field.inputs().join(" * sign ")
        ));
    }
    if let Some(request) = profile.set_parameter {
        out.push_str(&format!("  parameters via request {request}:\n"));
        for p in &profile.parameters {
            out.push_str(&format!(
                "    [{}] {:<12} initial {} max {}\n",
                p.index, p.name, p.initial, p.max
            ));
        }
    }
    if let Some(request) = profile.register_read {
        out.push_str(&format!("  register reads via request {request}\n"));
    }
    out
}

pub fn print_profiles(catalog: &ProfileCatalog, only: Option<&str>, json: bool) {
    let profiles: Vec<&DeviceProfile> = catalog
        .profiles
        .iter()
        .filter(|p| only.is_none_or(|name| p.name == name))
        .collect();

    if json {
        print_json(&json!({ "success": true, "profiles": profiles }));
        return;
    }
    for (i, profile) in profiles.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", render_profile(profile));
    }
}

/// One reading as aligned `name value` lines.
pub fn render_reading(reading: &Reading) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<16} {:.6}\n", "Time", reading.time));
    for (name, value) in &reading.fields {
        match value {
            Some(v) => {
                out.push_str(&format!("{name:<16} {v}\n"));
            }
            None => {
                out.push_str(&format!("{name:<16} -\n"));
            }
        }
    }
    out
}

pub fn reading_json(reading: &Reading) -> serde_json::Value {
    let fields: serde_json::Map<String, serde_json::Value> = reading
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), json!(value)))
        .collect();
    json!({ "time": reading.time, "fields": fields })
}

pub fn print_reading(reading: &Reading, json: bool) {
    if json {
        print_json(&json!({ "success": true, "reading": reading_json(reading) }));
    } else {
        print!("{}", render_reading(reading));
    }
}

pub fn print_summary(summary: &LoopSummary, output: Option<&std::path::Path>, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "summary": summary,
            "output": output.map(|p| p.display().to_string()),
        }));
        return;
    }
    println!("{}", "Session finished".bold());
    println!(
        "  ticks {}  rows written {}  flushes {}  elapsed {:.2}s",
        summary.ticks, summary.rows_written, summary.flushes, summary.elapsed_secs
    );
    if summary.transport_failures > 0 || summary.persistence_failures > 0 {
        println!(
            "  {} transport failure(s), {} persistence failure(s)",
            summary.transport_failures.to_string().yellow(),
            summary.persistence_failures.to_string().yellow()
        );
    }
    if let Some(path) = output {
        println!("  log: {}", path.display());
    }
}

pub fn print_register(address: u16, name: Option<&str>, word: u32, masked: u16, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "register": {
                "address": format!("0x{address:04X}"),
                "name": name,
                "raw": word,
                "value": masked,
            }
        }));
        return;
    }
    println!(
        "{} (0x{address:04X}): raw 0x{word:04X}, value {masked}",
        name.unwrap_or("register")
    );
}

pub fn print_parameter_set(name: &str, value: u8, index: u8, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "parameter": { "name": name, "index": index, "value": value }
        }));
    } else {
        println!("{} {name} = {value}", "✓".green());
    }
}

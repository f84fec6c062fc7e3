//! PID dispatch table and per-PID decoders.
//!
//! The table is an explicit immutable mapping from PID code to decode
//! routine, built once at engine construction. Every decoder checks
//! the PID registry before issuing its request and returns
//! [`Value::NoData`] for unsupported PIDs; failures are contained at
//! [`Elm327::decode_pid`](crate::Elm327::decode_pid).

use crate::dtc::{data_to_trouble_codes, describe_trouble_codes};
use crate::engine::Elm327;
use crate::error::DecodeError;
use crate::link::Link;
use crate::response::{ECHO_DTC, ECHO_MULTILINE, ECHO_STANDARD};
use crate::value::Value;
use indexmap::IndexMap;

pub(crate) type DecodeFn<L> = fn(&mut Elm327<L>) -> Result<Value, DecodeError>;

/// Immutable PID → decoder mapping.
pub(crate) struct DispatchTable<L: Link> {
    entries: IndexMap<&'static str, DecodeFn<L>>,
}

impl<L: Link> DispatchTable<L> {
    pub(crate) fn get(&self, pid: &str) -> Option<DecodeFn<L>> {
        self.entries.get(pid).copied()
    }

    /// PID codes with a registered decoder, in table order.
    pub(crate) fn pids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub(crate) fn new() -> Self {
        let entries: [(&'static str, DecodeFn<L>); 41] = [
            ("0101", |e| e.monitor_status()),
            ("0102", |e| e.raw_passthrough("0102")),
            ("0103", |e| e.fuel_system_status()),
            ("0104", |e| e.byte_percent("0104")),
            ("0105", |e| e.temperature("0105")),
            ("0106", |e| e.fuel_trim("0106")),
            ("0107", |e| e.fuel_trim("0107")),
            ("0108", |e| e.fuel_trim("0108")),
            ("0109", |e| e.fuel_trim("0109")),
            ("010A", |e| e.fuel_pressure()),
            ("010B", |e| e.byte_value("010B")),
            ("010C", |e| e.engine_rpm()),
            ("010D", |e| e.byte_value("010D")),
            ("010E", |e| e.timing_advance()),
            ("010F", |e| e.temperature("010F")),
            ("0110", |e| e.maf_rate()),
            ("0111", |e| e.byte_percent("0111")),
            ("0112", |e| e.secondary_air_status()),
            ("0113", |e| e.oxygen_sensors_present()),
            ("0114", |e| e.oxygen_sensor("0114")),
            ("0115", |e| e.oxygen_sensor("0115")),
            ("0116", |e| e.oxygen_sensor("0116")),
            ("0117", |e| e.oxygen_sensor("0117")),
            ("0118", |e| e.oxygen_sensor("0118")),
            ("0119", |e| e.oxygen_sensor("0119")),
            ("011A", |e| e.oxygen_sensor("011A")),
            ("011B", |e| e.oxygen_sensor("011B")),
            ("011C", |e| e.obd_standards()),
            ("0121", |e| e.word_value("0121")),
            ("03", |e| e.trouble_code_request("03")),
            ("04", |e| e.raw_passthrough("04")),
            ("07", |e| e.trouble_code_request("07")),
            ("0901", |e| e.message_count("0901")),
            ("0902", |e| e.hex_string("0902")),
            ("0903", |e| e.message_count("0903")),
            ("0904", |e| e.hex_string("0904")),
            ("0905", |e| e.message_count("0905")),
            ("0906", |e| e.hex_payload("0906")),
            ("0907", |e| e.message_count("0907")),
            ("0909", |e| e.message_count("0909")),
            ("090A", |e| e.hex_string("090A")),
        ];
        let mut table = IndexMap::with_capacity(entries.len());
        for (pid, decoder) in entries {
            table.insert(pid, decoder);
        }
        Self { entries: table }
    }
}

/// Parse the byte at `index` of a pruned hex payload.
fn hex_byte(data: &str, index: usize) -> Result<u8, DecodeError> {
    let start = index * 2;
    let digits = data.get(start..start + 2).ok_or(DecodeError::ShortPayload {
        wanted: start + 2,
        got: data.len(),
    })?;
    u8::from_str_radix(digits, 16).map_err(|e| DecodeError::BadHex(format!("{digits:?}: {e}")))
}

fn test_status(incomplete: bool) -> Value {
    Value::Text(if incomplete {
        "TEST [INCOMPLETE]".to_string()
    } else {
        "TEST".to_string()
    })
}

/// Continuously monitored tests in status byte 1: (test bit,
/// incomplete bit, name).
const CONTINUOUS_TESTS: [(u8, u8, &str); 3] = [
    (0x01, 0x10, "MISSFIRE"),
    (0x02, 0x20, "FUEL SYSTEM"),
    (0x04, 0x40, "COMPONENTS"),
];

/// Non-continuous test names for spark-ignition vehicles, one per bit
/// of status bytes 2 (enabled) and 3 (incomplete).
const SPARK_TESTS: [&str; 8] = [
    "CATALYST",
    "HEATED CATALYST",
    "EVAPORATIVE SYSTEM",
    "SECONDARY AIR SYSTEM",
    "A/C REFRIGERANT",
    "OXYGEN SENSOR",
    "OXYGEN SENSOR HEATER",
    "EGR SYSTEM",
];

/// Non-continuous test names for compression-ignition vehicles.
const COMPRESSION_TESTS: [&str; 8] = [
    "NMHC CATALYST",
    "NOx/SCR MONITOR",
    "Reserved 1",
    "BOOST PRESSURE",
    "Reserved 2",
    "EXHAUST GAS SENSOR",
    "PM FILTER MONITORING",
    "EGR/VVT SYSTEM",
];

impl<L: Link> Elm327<L> {
    fn supported(&self, pid: &str) -> bool {
        self.supported_pids().contains(pid)
    }

    /// PID 0101: monitor status since DTCs cleared.
    fn monitor_status(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("0101") {
            return Ok(Value::NoData);
        }
        let data = self.query("0101", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let byte1 = hex_byte(&data, 1)?;
        let byte2 = hex_byte(&data, 2)?;
        let byte3 = hex_byte(&data, 3)?;

        let mut record = IndexMap::new();
        let mil = if byte0 & 0x80 != 0 { "ON" } else { "OFF" };
        record.insert("MIL".to_string(), Value::Text(mil.to_string()));
        record.insert(
            "TROUBLE CODE COUNT".to_string(),
            Value::Integer(i64::from(byte0 & 0x7F)),
        );
        for (test_bit, incomplete_bit, name) in CONTINUOUS_TESTS {
            if byte1 & test_bit != 0 {
                record.insert(name.to_string(), test_status(byte1 & incomplete_bit != 0));
            }
        }
        // Bit 3 selects the ignition family; the two test-name sets
        // are mutually exclusive per vehicle.
        let compression = byte1 & 0x08 != 0;
        let ignition = if compression { "COMPRESSION" } else { "SPARK" };
        record.insert("IGNITION".to_string(), Value::Text(ignition.to_string()));
        let names = if compression {
            &COMPRESSION_TESTS
        } else {
            &SPARK_TESTS
        };
        for (bit, name) in names.iter().enumerate() {
            let mask = 1u8 << bit;
            if byte2 & mask != 0 {
                record.insert((*name).to_string(), test_status(byte3 & mask != 0));
            }
        }
        Ok(Value::Record(record))
    }

    /// PID 0103: fuel system status, one categorical entry per system.
    fn fuel_system_status(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("0103") {
            return Ok(Value::NoData);
        }
        let data = self.query("0103", ECHO_STANDARD)?;
        let tables = self.tables();
        let mut record = IndexMap::new();
        for (label, start) in [("Fuel System 1", 0), ("Fuel System 2", 2)] {
            let code = data.get(start..start + 2).unwrap_or("");
            let status = match tables.fuel_system_status.get(code) {
                Some(text) => Value::Text(text.to_string()),
                None => Value::Invalid,
            };
            record.insert(label.to_string(), status);
        }
        Ok(Value::Record(record))
    }

    /// PID 0112: commanded secondary air status.
    fn secondary_air_status(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("0112") {
            return Ok(Value::NoData);
        }
        let data = self.query("0112", ECHO_STANDARD)?;
        let tables = self.tables();
        Ok(match tables.secondary_air_status.get(&data) {
            Some(text) => Value::Text(text.to_string()),
            None => Value::Invalid,
        })
    }

    /// PID 011C: OBD standard the vehicle conforms to.
    fn obd_standards(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("011C") {
            return Ok(Value::NoData);
        }
        let data = self.query("011C", ECHO_STANDARD)?;
        let tables = self.tables();
        Ok(match tables.obd_standards.get(&data) {
            Some(text) => Value::Text(text.to_string()),
            None => Value::Invalid,
        })
    }

    /// PID 0113: oxygen sensors present, one nibble per bank.
    fn oxygen_sensors_present(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("0113") {
            return Ok(Value::NoData);
        }
        let data = self.query("0113", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let mut record = IndexMap::new();
        record.insert(
            "BANK1".to_string(),
            Value::Integer(i64::from(byte0 & 0x0F)),
        );
        record.insert(
            "BANK2".to_string(),
            Value::Integer(i64::from((byte0 & 0xF0) >> 4)),
        );
        Ok(Value::Record(record))
    }

    /// PIDs 0114–011B: oxygen sensor voltage plus short-term fuel
    /// trim.
    fn oxygen_sensor(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let byte1 = hex_byte(&data, 1)?;
        let mut record = IndexMap::new();
        record.insert(
            "VOLTAGE".to_string(),
            Value::Float(f64::from(byte0) / 200.0),
        );
        record.insert(
            "TRIM".to_string(),
            Value::Float(100.0 * f64::from(byte1) / 128.0 - 100.0),
        );
        Ok(Value::Record(record))
    }

    /// PIDs 0104/0111: single byte scaled to 0–100 %.
    fn byte_percent(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Float(100.0 * f64::from(byte0) / 255.0))
    }

    /// PIDs 0105/010F: temperature with a -40 °C offset.
    fn temperature(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Integer(i64::from(byte0) - 40))
    }

    /// PIDs 0106–0109: fuel trim as a signed percentage around 128.
    fn fuel_trim(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Float(100.0 * f64::from(byte0) / 128.0 - 100.0))
    }

    /// PID 010A: fuel pressure, 3 kPa per count.
    fn fuel_pressure(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("010A") {
            return Ok(Value::NoData);
        }
        let data = self.query("010A", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Integer(3 * i64::from(byte0)))
    }

    /// PIDs 010B/010D: the first byte as-is (kPa / km/h).
    fn byte_value(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Integer(i64::from(byte0)))
    }

    /// PID 010C: engine RPM in quarter revolutions.
    fn engine_rpm(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("010C") {
            return Ok(Value::NoData);
        }
        let data = self.query("010C", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let byte1 = hex_byte(&data, 1)?;
        Ok(Value::Float(
            (256.0 * f64::from(byte0) + f64::from(byte1)) / 4.0,
        ))
    }

    /// PID 010E: timing advance in half degrees before TDC.
    fn timing_advance(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("010E") {
            return Ok(Value::NoData);
        }
        let data = self.query("010E", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        Ok(Value::Float(f64::from(byte0) / 2.0 - 64.0))
    }

    /// PID 0110: MAF rate in hundredths of a gram per second.
    fn maf_rate(&mut self) -> Result<Value, DecodeError> {
        if !self.supported("0110") {
            return Ok(Value::NoData);
        }
        let data = self.query("0110", ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let byte1 = hex_byte(&data, 1)?;
        Ok(Value::Float(
            (256.0 * f64::from(byte0) + f64::from(byte1)) / 100.0,
        ))
    }

    /// PID 0121: distance travelled with the MIL on.
    fn word_value(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let byte0 = hex_byte(&data, 0)?;
        let byte1 = hex_byte(&data, 1)?;
        Ok(Value::Integer(256 * i64::from(byte0) + i64::from(byte1)))
    }

    /// Modes 03/07: read and describe trouble codes.
    fn trouble_code_request(&mut self, request: &str) -> Result<Value, DecodeError> {
        if !self.supported(request) {
            return Ok(Value::NoData);
        }
        let data = self.query(request, ECHO_DTC)?;
        let tables = self.tables();
        let codes = data_to_trouble_codes(&data, &tables.trouble_code_prefix)?;
        Ok(Value::TroubleCodes(describe_trouble_codes(
            codes,
            &tables.trouble_code_descriptions,
        )))
    }

    /// PIDs with no defined decode (0102 freeze DTC, 04 clear): the
    /// normalized adapter text, verbatim.
    fn raw_passthrough(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let raw = self.raw_command(pid)?;
        Ok(Value::Text(crate::response::normalize(&raw)))
    }

    /// Mode 09 message-count PIDs: the whole pruned payload as an
    /// integer.
    fn message_count(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_STANDARD)?;
        let count = u32::from_str_radix(&data, 16)
            .map_err(|e| DecodeError::BadHex(format!("{data:?}: {e}")))?;
        Ok(Value::Integer(i64::from(count)))
    }

    /// String PIDs (VIN, calibration ID, ECU name): hex-decode the
    /// payload and render zero bytes as spaces.
    fn hex_string(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_MULTILINE)?;
        let mut bytes = hex::decode(&data).map_err(|e| DecodeError::BadHex(e.to_string()))?;
        for byte in &mut bytes {
            if *byte == 0 {
                *byte = b' ';
            }
        }
        String::from_utf8(bytes)
            .map(Value::Text)
            .map_err(|e| DecodeError::BadText(e.to_string()))
    }

    /// PID 0906: calibration verification numbers as raw hex text.
    fn hex_payload(&mut self, pid: &str) -> Result<Value, DecodeError> {
        if !self.supported(pid) {
            return Ok(Value::NoData);
        }
        let data = self.query(pid, ECHO_MULTILINE)?;
        Ok(Value::Text(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ScriptedLink;
    use crate::tables::Tables;
    use std::sync::Arc;

    fn engine_with_tables(tables: Tables) -> Elm327<ScriptedLink> {
        let mut link = ScriptedLink::new();
        link.push_response("\r\rELM327 v1.5\r\r");
        link.push_response("AT E0\r\rOK\r\r");
        link.push_response("OK\r\r");
        link.push_response("OK\r\r");
        link.push_response("OK\r\r");
        Elm327::new(link, Arc::new(tables))
    }

    fn engine() -> Elm327<ScriptedLink> {
        engine_with_tables(Tables::default())
    }

    #[test]
    fn coolant_temperature_applies_offset() {
        let mut engine = engine();
        engine.test_register("0105");
        engine.test_push_response("41054F\r\r");
        // 0x4F = 79, 79 - 40 = 39.
        assert_eq!(engine.decode_pid("0105"), Value::Integer(39));
    }

    #[test]
    fn coolant_temperature_can_go_below_freezing() {
        let mut engine1 = engine();
        engine1.test_register("0105");
        engine1.test_push_response("410512\r\r");
        // 0x12 = 18, 18 - 40 = -22.
        assert_eq!(engine1.decode_pid("0105"), Value::Integer(-22));

        let mut engine2 = engine();
        engine2.test_register("0105");
        engine2.test_push_response("410532\r\r");
        assert_eq!(engine2.decode_pid("0105"), Value::Integer(10));
    }

    #[test]
    fn rpm_divides_by_four() {
        let mut engine = engine();
        engine.test_register("010C");
        engine.test_push_response("410C0C00\r\r");
        assert_eq!(engine.decode_pid("010C"), Value::Float(768.0));
    }

    #[test]
    fn vehicle_speed_is_the_raw_byte() {
        let mut engine = engine();
        engine.test_register("010D");
        engine.test_push_response("410D3C\r\r");
        assert_eq!(engine.decode_pid("010D"), Value::Integer(60));
    }

    #[test]
    fn engine_load_scales_to_percent() {
        let mut engine = engine();
        engine.test_register("0104");
        engine.test_push_response("4104FF\r\r");
        assert_eq!(engine.decode_pid("0104"), Value::Float(100.0));
    }

    #[test]
    fn fuel_trim_centers_on_128() {
        let mut engine = engine();
        engine.test_register("0106");
        engine.test_push_response("410680\r\r");
        assert_eq!(engine.decode_pid("0106"), Value::Float(0.0));
    }

    #[test]
    fn maf_rate_scales_to_grams_per_second() {
        let mut engine = engine();
        engine.test_register("0110");
        engine.test_push_response("41100190\r\r");
        // 0x0190 = 400, 400 / 100 = 4 g/s.
        assert_eq!(engine.decode_pid("0110"), Value::Float(4.0));
    }

    #[test]
    fn timing_advance_offsets_by_64() {
        let mut engine = engine();
        engine.test_register("010E");
        engine.test_push_response("410E80\r\r");
        assert_eq!(engine.decode_pid("010E"), Value::Float(0.0));
    }

    #[test]
    fn distance_with_mil_is_a_word() {
        let mut engine = engine();
        engine.test_register("0121");
        engine.test_push_response("41210102\r\r");
        assert_eq!(engine.decode_pid("0121"), Value::Integer(258));
    }

    #[test]
    fn oxygen_sensor_yields_a_two_field_record() {
        let mut engine = engine();
        engine.test_register("0114");
        engine.test_push_response("41146480\r\r");
        let value = engine.decode_pid("0114");
        let Value::Record(fields) = value else {
            panic!("expected a record, got {value:?}");
        };
        assert_eq!(
            fields.get_index(0),
            Some((&"VOLTAGE".to_string(), &Value::Float(0.5)))
        );
        assert_eq!(
            fields.get_index(1),
            Some((&"TRIM".to_string(), &Value::Float(0.0)))
        );
    }

    #[test]
    fn fuel_system_status_looks_up_both_systems() {
        let mut tables = Tables::default();
        tables.fuel_system_status =
            crate::tables::LookupTable::parse("01 Open loop\n02 Closed loop\n");
        let mut engine = engine_with_tables(tables);
        engine.test_register("0103");
        engine.test_push_response("41030105\r\r");
        let Value::Record(fields) = engine.decode_pid("0103") else {
            panic!("expected a record");
        };
        assert_eq!(fields["Fuel System 1"], Value::Text("Open loop".to_string()));
        assert_eq!(fields["Fuel System 2"], Value::Invalid);
    }

    #[test]
    fn obd_standards_unknown_code_is_invalid() {
        let mut engine = engine();
        engine.test_register("011C");
        engine.test_push_response("411CFE\r\r");
        assert_eq!(engine.decode_pid("011C"), Value::Invalid);
    }

    #[test]
    fn monitor_status_spark_ignition() {
        let mut engine = engine();
        engine.test_register("0101");
        // MIL on with 2 codes; missfire test incomplete, fuel system
        // complete; spark ignition; catalyst enabled and incomplete.
        engine.test_push_response("410182130101\r\r");
        let Value::Record(fields) = engine.decode_pid("0101") else {
            panic!("expected a record");
        };
        assert_eq!(fields["MIL"], Value::Text("ON".to_string()));
        assert_eq!(fields["TROUBLE CODE COUNT"], Value::Integer(2));
        assert_eq!(fields["MISSFIRE"], Value::Text("TEST [INCOMPLETE]".to_string()));
        assert_eq!(fields["FUEL SYSTEM"], Value::Text("TEST".to_string()));
        assert_eq!(fields["IGNITION"], Value::Text("SPARK".to_string()));
        assert_eq!(fields["CATALYST"], Value::Text("TEST [INCOMPLETE]".to_string()));
        assert!(!fields.contains_key("NMHC CATALYST"));
    }

    #[test]
    fn monitor_status_compression_ignition_uses_other_name_set() {
        let mut engine = engine();
        engine.test_register("0101");
        // Bit 3 of byte 1 selects the compression set; bit 0 of byte 2
        // enables the first test.
        engine.test_push_response("410100080100\r\r");
        let Value::Record(fields) = engine.decode_pid("0101") else {
            panic!("expected a record");
        };
        assert_eq!(fields["IGNITION"], Value::Text("COMPRESSION".to_string()));
        assert_eq!(fields["NMHC CATALYST"], Value::Text("TEST".to_string()));
        assert!(!fields.contains_key("CATALYST"));
    }

    #[test]
    fn vin_decodes_with_zero_bytes_as_spaces() {
        let mut engine = engine();
        engine.test_register("0902");
        engine.test_push_response("49020100574442\r49020231323334\r\r");
        assert_eq!(
            engine.decode_pid("0902"),
            Value::Text(" WDB1234".to_string())
        );
    }

    #[test]
    fn message_count_reads_whole_payload() {
        let mut engine = engine();
        engine.test_register("0901");
        engine.test_push_response("490105\r\r");
        assert_eq!(engine.decode_pid("0901"), Value::Integer(5));
    }

    #[test]
    fn trouble_codes_decode_and_describe() {
        let mut tables = Tables::default();
        tables.trouble_code_prefix = crate::tables::LookupTable::parse("0 P0\n1 P1\n");
        tables.trouble_code_descriptions =
            crate::tables::LookupTable::parse("P0133 O2 Sensor Circuit Slow Response\n");
        let mut engine = engine_with_tables(tables);
        engine.test_register("03");
        engine.test_push_response("4301330000\r\r");
        let Value::TroubleCodes(codes) = engine.decode_pid("03") else {
            panic!("expected trouble codes");
        };
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].code, "P0133");
        assert_eq!(
            codes[0].description.as_deref(),
            Some("O2 Sensor Circuit Slow Response")
        );
    }

    #[test]
    fn no_data_reply_decodes_to_zero_codes() {
        let mut tables = Tables::default();
        tables.trouble_code_prefix = crate::tables::LookupTable::parse("0 P0\n");
        let mut engine = engine_with_tables(tables);
        engine.test_register("03");
        engine.test_push_response("NO DATA\r\r");
        assert_eq!(engine.decode_pid("03"), Value::TroubleCodes(Vec::new()));
    }

    #[test]
    fn unregistered_pid_is_not_implemented() {
        let mut engine = engine();
        assert_eq!(engine.decode_pid("01FF"), Value::NotImplemented);
        assert_eq!(engine.decode_pid("1234"), Value::NotImplemented);
    }

    #[test]
    fn unsupported_pid_is_no_data_and_sends_nothing() {
        let mut engine = engine();
        let sent_before = engine.test_sent_count();
        assert_eq!(engine.decode_pid("0105"), Value::NoData);
        assert_eq!(engine.test_sent_count(), sent_before);
    }

    #[test]
    fn decoder_failure_is_contained_as_error() {
        let mut engine = engine();
        engine.test_register("010C");
        engine.test_push_response("41\r\r"); // too short for the formula
        assert_eq!(engine.decode_pid("010C"), Value::Error);
    }

    #[test]
    fn sentinels_are_pairwise_distinct() {
        let mut engine = engine();
        engine.test_register("010C");
        engine.test_push_response("41\r\r");
        let error = engine.decode_pid("010C");
        let not_implemented = engine.decode_pid("01FF");
        let no_data = engine.decode_pid("010D");
        assert_ne!(error, not_implemented);
        assert_ne!(error, no_data);
        assert_ne!(not_implemented, no_data);
    }

    #[test]
    fn dispatch_table_has_one_entry_per_pid() {
        let table = DispatchTable::<ScriptedLink>::new();
        let pids: Vec<_> = table.pids().collect();
        let mut deduped = pids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(pids.len(), deduped.len());
    }
}

use rowkey::DateBucket;
use serde_json::json;
use table::Table;

pub const WIN_DUMP: &str = "OS|Windows NT|5.1.2600 Service Pack 3\n\
CPU|x86|GenuineIntel family 6 model 23 stepping 10|2\n\
Crash|EXCEPTION_ACCESS_VIOLATION|0x0|0\n\
Module|firefox.exe|3.6.6.3863|firefox.pdb|A1B2|0x00400000|0x0040f000|1\n\
Module|xul.dll|1.9.2.3863|xul.pdb|C3D4|0x10000000|0x10f00000|0\n\
0|0|xul.dll|js_Interpret|js/src/jsinterp.cpp|1234|0x0";

pub const LINUX_DUMP: &str = "OS|Linux|0.0.0 Linux 2.6.32\n\
CPU|amd64|family 6 model 15 stepping 6|4\n\
Module|firefox-bin||firefox-bin|9F3E|0x00400000|0x00420000|1\n\
Module|libxul.so||libxul.so|77AA01|0x7f000000|0x7f100000|0";

pub fn day(s: &str) -> DateBucket {
    DateBucket::parse(s).unwrap()
}

pub fn crash(os: &str, signature: Option<&str>, date_processed: &str, dump: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "product": "Firefox",
        "version": "3.6.6",
        "os_name": os,
        "signature": signature,
        "reason": "EXCEPTION_ACCESS_VIOLATION",
        "date_processed": date_processed,
        "dump": dump,
        "addons": [["{972ce4c6-7e08-4474-a285-3208198ce6fd}", "3.6.6"], ["testpilot@labs.mozilla.com", "1.0.2"]]
    }))
    .unwrap()
}

pub fn source() -> Table {
    Table::in_memory("crash_reports", &[b"4".to_vec(), b"8".to_vec(), b"c".to_vec()])
}

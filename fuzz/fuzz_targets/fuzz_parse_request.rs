#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil::dispatch::parse_request;

fuzz_target!(|data: &[u8]| {
    // Every rejection must still produce a well-formed reply
    if let Err(e) = parse_request(data) {
        let reply = e.response();
        assert_eq!(reply[0], serde_json::Value::from(e.tag()));
    }
});

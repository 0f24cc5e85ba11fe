//! Common test utilities for bridge tests

use sandbox_bridge::{
    decode_replies, encode_calls, Call, Dispatcher, MemoryEngine, MethodRegistry, Reply,
    Transport, WireValue, DEFAULT_MAX_MESSAGE_BYTES,
};

/// A host session against an in-memory engine.
pub struct Host {
    pub dispatcher: Dispatcher,
    pub engine: MemoryEngine,
}

impl Host {
    pub fn new() -> Self {
        Host {
            dispatcher: MethodRegistry::with_builtin_methods()
                .unwrap()
                .into_dispatcher(),
            engine: MemoryEngine::new(1),
        }
    }

    /// Frame `calls`, serve them, and return the replies in order.
    pub fn send(&mut self, calls: &[Call]) -> Vec<Reply> {
        let input = encode_calls(calls).unwrap();
        let mut transport = Transport::new(&input[..], Vec::new(), DEFAULT_MAX_MESSAGE_BYTES);
        let served = self
            .dispatcher
            .serve(&mut self.engine, &mut transport)
            .unwrap();
        assert_eq!(served, calls.len() as u64);
        let (_, output) = transport.into_inner();
        decode_replies(&output).unwrap()
    }

    /// Send one call and return its successful result.
    pub fn ok(&mut self, call: Call) -> WireValue {
        match self.send(&[call]).remove(0) {
            Reply::Data(value) => value,
            Reply::Exc(failure) => panic!("call failed: {:?}", failure),
        }
    }

    /// Send one call and return its failure kind.
    pub fn fail(&mut self, call: Call) -> String {
        match self.send(&[call]).remove(0) {
            Reply::Exc(failure) => failure.kind,
            Reply::Data(value) => panic!("call succeeded: {:?}", value),
        }
    }
}

/// Snapshot bytes as the host stores them.
pub fn snapshot(entries: Vec<(&str, WireValue)>) -> WireValue {
    WireValue::Bytes(sandbox_core::to_msgpack(&WireValue::text_map(entries)).unwrap())
}

/// A list of integers.
pub fn ints(values: &[i64]) -> WireValue {
    WireValue::Array(values.iter().copied().map(WireValue::Int).collect())
}

/// A list of texts.
#[allow(dead_code)]
pub fn texts(values: &[&str]) -> WireValue {
    WireValue::Array(values.iter().map(|s| WireValue::from(*s)).collect())
}

/// The `[tag, args...]` structural form.
#[allow(dead_code)]
pub fn object(tag: &str, args: Vec<WireValue>) -> WireValue {
    let mut items = vec![WireValue::from(tag)];
    items.extend(args);
    WireValue::Array(items)
}

//! The Dispatcher - single entry point from the host into the engine.
//!
//! The Dispatcher routes each inbound call to the method registered under
//! its name. It holds the closed method table and nothing else: the engine
//! is passed in by the caller, one call at a time.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use sandbox_core::WireValue;
use tracing::{info, warn};

use crate::args::CallArgs;
use crate::facade::EngineFacade;
use crate::registry::MethodRegistration;
use crate::transport::{Call, Reply, Transport};
use crate::{Error, Result};

/// Routes calls to registered methods.
///
/// Built by [`MethodRegistry::into_dispatcher`](crate::MethodRegistry::into_dispatcher);
/// the method table cannot change afterwards.
///
/// # Example
///
/// ```ignore
/// let dispatcher = MethodRegistry::with_builtin_methods()?.into_dispatcher();
/// let mut engine = MemoryEngine::new(1);
///
/// // Single call
/// let version = dispatcher.call(&mut engine, Call::new("get_version", vec![]))?;
///
/// // Serve the host until it closes the channel
/// let mut transport = Transport::new(stdin, stdout, DEFAULT_MAX_MESSAGE_BYTES);
/// dispatcher.serve(&mut engine, &mut transport)?;
/// ```
pub struct Dispatcher {
    methods: BTreeMap<String, MethodRegistration>,
}

impl Dispatcher {
    pub(crate) fn new(methods: BTreeMap<String, MethodRegistration>) -> Self {
        Self { methods }
    }

    /// Names of all registered methods, sorted.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Whether `name` can be called.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Execute a single call.
    ///
    /// Returns the method's result or its failure unchanged.
    pub fn call(&self, engine: &mut dyn EngineFacade, call: Call) -> Result<WireValue> {
        let registration = self
            .methods
            .get(&call.name)
            .ok_or_else(|| Error::UnknownMethod {
                name: call.name.clone(),
            })?;
        let args = CallArgs::new(call.name, call.args, call.kwargs);
        (registration.handler)(engine, args)
    }

    /// Execute a call and turn the outcome into the reply for the host.
    pub fn reply(&self, engine: &mut dyn EngineFacade, call: Call) -> Reply {
        let name = call.name.clone();
        match self.call(engine, call) {
            Ok(value) => Reply::Data(value),
            Err(e) => {
                warn!(
                    target: "sandbox::dispatch",
                    method = %name,
                    kind = e.kind(),
                    error = %e,
                    "Call failed"
                );
                Reply::failure(&e)
            }
        }
    }

    /// Serve calls until the host closes the channel.
    ///
    /// Each call runs to completion before the next is read. Failures of a
    /// single call are answered and the loop continues, including a result
    /// too large to send. Channel errors and oversized inbound frames end
    /// the loop. Returns the number of calls answered.
    pub fn serve<R: Read, W: Write>(
        &self,
        engine: &mut dyn EngineFacade,
        transport: &mut Transport<R, W>,
    ) -> Result<u64> {
        info!(
            target: "sandbox::dispatch",
            methods = self.methods.len(),
            "Serving calls"
        );
        let mut served = 0u64;
        while let Some(call) = transport.read_call()? {
            let reply = match call {
                Ok(call) => self.reply(engine, call),
                Err(e) => {
                    warn!(target: "sandbox::dispatch", error = %e, "Malformed call");
                    Reply::failure(&e)
                }
            };
            match transport.write_reply(&reply) {
                // The result does not fit a frame: answer with the failure instead
                Err(e @ Error::FrameTooLarge { .. }) => {
                    warn!(target: "sandbox::dispatch", error = %e, "Reply too large");
                    transport.write_reply(&Reply::failure(&e))?;
                }
                other => other?,
            }
            served += 1;
        }
        info!(target: "sandbox::dispatch", served, "Host closed the channel");
        Ok(served)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

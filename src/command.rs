use crate::error::{CdpError, CdpResult};
use crate::protocol::{encode_command, RawPayload};
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::sync::oneshot;

/// Outcome delivered to the caller of a command.
pub(crate) type CommandOutcome = CdpResult<RawPayload>;

/// One outbound request: method, encoded params and the id it travels under.
#[derive(Debug, Clone)]
pub(crate) struct Command {
    id: u64,
    method: String,
    params: Option<Box<RawValue>>,
}

impl Command {
    /// Builds a command, encoding `params` up front so an unserializable
    /// payload is rejected before anything is registered or written.
    /// A payload encoding to `null` (e.g. `None`) is sent without `params`.
    pub(crate) fn new<P: Serialize>(id: u64, method: &str, params: &P) -> CdpResult<Self> {
        if method.is_empty() {
            return Err(CdpError::InvalidMethod(method.to_string()));
        }

        let raw = serde_json::value::to_raw_value(params)?;
        let params = (raw.get() != "null").then_some(raw);

        Ok(Self {
            id,
            method: method.to_string(),
            params,
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    pub(crate) fn encode(&self) -> CdpResult<String> {
        encode_command(self.id, &self.method, self.params())
    }

    /// Splits off the completion pair: the resolver goes into the pending
    /// table, the caller keeps the [`Completion`].
    pub(crate) fn completion(&self) -> (PendingCommand, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            PendingCommand {
                method: self.method.clone(),
                done: tx,
            },
            Completion(rx),
        )
    }
}

/// The table-side half of an in-flight command. Resolving consumes it, so a
/// command can be resolved at most once.
#[derive(Debug)]
pub(crate) struct PendingCommand {
    method: String,
    done: oneshot::Sender<CommandOutcome>,
}

impl PendingCommand {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn resolve(self, outcome: CommandOutcome) {
        // The caller may have given up (timeout or dropped future).
        let _ = self.done.send(outcome);
    }
}

/// The caller-side half: awaits exactly one outcome.
#[derive(Debug)]
pub(crate) struct Completion(oneshot::Receiver<CommandOutcome>);

impl Completion {
    pub(crate) async fn wait(self) -> CommandOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CdpError::disconnected("command dropped without a response")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NoParams;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_command_encodes_params() {
        let command = Command::new(1, "Foo.bar", &json!({"x": 1})).unwrap();
        assert_eq!(command.id(), 1);
        assert_eq!(command.method(), "Foo.bar");
        assert_eq!(
            command.encode().unwrap(),
            r#"{"id":1,"method":"Foo.bar","params":{"x":1}}"#
        );
    }

    #[test]
    fn test_null_params_are_omitted() {
        let command = Command::new(2, "Foo.baz", &None::<u8>).unwrap();
        assert!(command.params().is_none());
        assert_eq!(command.encode().unwrap(), r#"{"id":2,"method":"Foo.baz"}"#);

        let command = Command::new(3, "Page.enable", &NoParams {}).unwrap();
        assert_eq!(command.params().map(|p| p.get()), Some("{}"));
    }

    #[test]
    fn test_empty_method_is_rejected() {
        assert!(matches!(
            Command::new(1, "", &NoParams {}),
            Err(CdpError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_unserializable_params_are_rejected() {
        let mut params = HashMap::new();
        params.insert(vec![1u8], 1u8);
        assert!(matches!(
            Command::new(1, "Foo.bar", &params),
            Err(CdpError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_completion_receives_single_outcome() {
        let command = Command::new(7, "Foo.bar", &NoParams {}).unwrap();
        let (pending, completion) = command.completion();
        assert_eq!(pending.method(), "Foo.bar");

        pending.resolve(RawPayload::from_serialize(&json!({"y": 2})));
        let payload = completion.wait().await.unwrap();
        assert_eq!(payload.get(), r#"{"y":2}"#);
    }

    #[tokio::test]
    async fn test_dropped_resolver_reports_disconnect() {
        let command = Command::new(8, "Foo.bar", &NoParams {}).unwrap();
        let (pending, completion) = command.completion();
        drop(pending);

        assert!(matches!(
            completion.wait().await,
            Err(CdpError::Disconnected { .. })
        ));
    }
}

use serde::Serialize;

use crate::ToneAnalysis;

/// How the `text` field of the outbound body is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// `{"text":"<input>"}`.
    #[default]
    Plain,
    /// `{"text":"\"<input>\""}`: the input wrapped in literal quote
    /// characters before encoding, as older deployments were sent.
    LegacyQuoted,
}

#[derive(Serialize)]
struct ToneInput<'a> {
    text: &'a str,
}

pub(crate) fn encode_body(text: &str, encoding: TextEncoding) -> serde_json::Result<Vec<u8>> {
    match encoding {
        TextEncoding::Plain => serde_json::to_vec(&ToneInput { text }),
        TextEncoding::LegacyQuoted => {
            let quoted = format!("\"{text}\"");
            serde_json::to_vec(&ToneInput { text: &quoted })
        }
    }
}

pub type ToneCallback<C> = Box<dyn FnOnce(Option<ToneAnalysis>, C) + Send + 'static>;

/// A submitted tone request waiting for its response: the caller's callback
/// and the context to hand back with the result. Consumed by [`deliver`].
///
/// [`deliver`]: ToneRequest::deliver
pub struct ToneRequest<C> {
    callback: ToneCallback<C>,
    context: C,
}

impl<C> ToneRequest<C> {
    pub(crate) fn new(callback: ToneCallback<C>, context: C) -> Self {
        Self { callback, context }
    }

    pub(crate) fn deliver(self, result: Option<ToneAnalysis>) {
        (self.callback)(result, self.context);
    }
}

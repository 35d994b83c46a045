//! Outbound script evaluation
//!
//! Everything the bridge says to the page is a snippet of JavaScript handed
//! to the webview. Evaluation is fire-and-forget: the webview may run the
//! snippet later on its own thread, and nothing comes back.

use serde_json::Value;
use tauri::{Runtime, WebviewWindow};

use crate::config::session::ERROR_BRIDGE_CALLBACK;
use crate::error::ScriptError;

/// One-way script evaluation in the web runtime
pub trait ScriptSink: Send + Sync {
    fn evaluate(&self, script: &str) -> Result<(), ScriptError>;
}

/// [`ScriptSink`] backed by a Tauri webview window
pub struct WebviewScriptSink<R: Runtime> {
    window: WebviewWindow<R>,
}

impl<R: Runtime> WebviewScriptSink<R> {
    pub fn new(window: WebviewWindow<R>) -> Self {
        Self { window }
    }
}

impl<R: Runtime> ScriptSink for WebviewScriptSink<R> {
    fn evaluate(&self, script: &str) -> Result<(), ScriptError> {
        self.window
            .eval(script)
            .map_err(|e| ScriptError::Eval(e.to_string()))
    }
}

/// Acknowledgement sent to a page callback
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Passed as a quoted string literal
    Text(String),
    /// Passed as a JSON object literal
    Object(Value),
}

impl Reply {
    /// JavaScript expression for the reply argument
    pub fn to_argument(&self) -> Result<String, ScriptError> {
        let argument = match self {
            Self::Text(text) => serde_json::to_string(text)?,
            Self::Object(value) => serde_json::to_string(value)?,
        };
        Ok(argument)
    }
}

/// Call `window[callback](argument)`, logging any exception it throws
///
/// `argument` must already be a JavaScript expression (e.g. JSON). The
/// callback name is quoted, never spliced in as code.
pub fn invoke_callback(callback: &str, argument: &str) -> String {
    // Serializing a &str cannot fail.
    let name = serde_json::to_string(callback).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(function(){{try{{var f=window[{name}];if(typeof f==='function'){{f({argument});}}}}\
         catch(e){{console.error('arbridge: callback '+{name}+' threw',e);}}}})();"
    )
}

/// Script injected into every page before its own scripts run
///
/// Exposes `window.arBridge.postMessage(channel, body)` on top of the Tauri
/// `post_message` command and forwards uncaught errors to the bridge log
/// through the `initAR` channel.
pub fn capability_script() -> String {
    format!(
        r#"(function () {{
  if (window.arBridge) {{ return; }}
  function post(channel, body) {{
    return window.__TAURI_INTERNALS__.invoke('post_message', {{ channel: channel, body: body || {{}} }});
  }}
  function report(message) {{
    try {{ post('initAR', {{ callback: '{callback}', error_message: String(message) }}); }} catch (_) {{}}
  }}
  window.arBridge = {{ postMessage: post }};
  window.addEventListener('error', function (event) {{
    report(event.message + ' (' + event.filename + ':' + event.lineno + ')');
  }});
  window.addEventListener('unhandledrejection', function (event) {{
    report(event.reason);
  }});
}})();"#,
        callback = ERROR_BRIDGE_CALLBACK
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_reply_is_quoted() {
        let reply = Reply::Text("device \"1\"".into());
        assert_eq!(reply.to_argument().unwrap(), r#""device \"1\"""#);
    }

    #[test]
    fn test_object_reply_is_json() {
        let reply = Reply::Object(json!({"cameraAccess": true}));
        assert_eq!(reply.to_argument().unwrap(), r#"{"cameraAccess":true}"#);
    }

    #[test]
    fn test_callback_name_is_escaped() {
        let script = invoke_callback("cb');alert(1);('", "{}");
        assert!(script.contains(r#"window["cb');alert(1);('"]"#));
        assert!(script.contains("f({})"));
        assert!(script.contains("catch(e)"));
    }

    #[test]
    fn test_capability_script_routes_errors_to_init() {
        let script = capability_script();
        assert!(script.contains("'initAR'"));
        assert!(script.contains(ERROR_BRIDGE_CALLBACK));
        assert!(script.contains("'post_message'"));
    }
}

//! Call-control instructions and their TwiML rendering.

use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SayOptions {
    pub language: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialOptions {
    pub action: String,
    pub caller_id: Option<String>,
    pub timeout: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherOptions {
    pub num_digits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say { options: SayOptions, text: String },
    Play { url: String },
    Dial { options: DialOptions, number: String },
    Gather(Gather),
    Redirect { url: String },
    Hangup,
}

/// Anything a message can be spoken or played into.
pub trait MessageSink {
    fn say(&mut self, options: SayOptions, text: &str);
    fn play(&mut self, url: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub options: GatherOptions,
    pub verbs: Vec<Verb>,
}

impl MessageSink for Gather {
    fn say(&mut self, options: SayOptions, text: &str) {
        self.verbs.push(Verb::Say { options, text: text.to_string() });
    }

    fn play(&mut self, url: &str) {
        self.verbs.push(Verb::Play { url: url.to_string() });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn dial(&mut self, options: DialOptions, number: &str) {
        self.verbs.push(Verb::Dial { options, number: number.to_string() });
    }

    pub fn redirect(&mut self, url: &str) {
        self.verbs.push(Verb::Redirect { url: url.to_string() });
    }

    pub fn hangup(&mut self) {
        self.verbs.push(Verb::Hangup);
    }

    /// Appends a `<Gather>` whose nested prompt is filled in by `prompt`.
    pub fn gather(&mut self, options: GatherOptions, prompt: impl FnOnce(&mut Gather)) {
        let mut gather = Gather { options, verbs: Vec::new() };
        prompt(&mut gather);
        self.verbs.push(Verb::Gather(gather));
    }
}

impl MessageSink for VoiceResponse {
    fn say(&mut self, options: SayOptions, text: &str) {
        self.verbs.push(Verb::Say { options, text: text.to_string() });
    }

    fn play(&mut self, url: &str) {
        self.verbs.push(Verb::Play { url: url.to_string() });
    }
}

impl fmt::Display for VoiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#)?;
        for verb in &self.verbs {
            write_verb(f, verb)?;
        }
        f.write_str("</Response>")
    }
}

fn write_verb(out: &mut impl Write, verb: &Verb) -> fmt::Result {
    match verb {
        Verb::Say { options, text } => write!(
            out,
            r#"<Say language="{}" voice="{}">{}</Say>"#,
            xml_escape(&options.language),
            xml_escape(&options.voice),
            xml_escape(text)
        ),
        Verb::Play { url } => write!(out, "<Play>{}</Play>", xml_escape(url)),
        Verb::Dial { options, number } => {
            write!(out, r#"<Dial action="{}""#, xml_escape(&options.action))?;
            if let Some(caller_id) = &options.caller_id {
                write!(out, r#" callerId="{}""#, xml_escape(caller_id))?;
            }
            write!(
                out,
                r#" timeout="{}">{}</Dial>"#,
                itoa::Buffer::new().format(options.timeout),
                xml_escape(number)
            )
        }
        Verb::Gather(gather) => {
            write!(out, r#"<Gather numDigits="{}">"#, itoa::Buffer::new().format(gather.options.num_digits))?;
            for nested in &gather.verbs {
                write_verb(out, nested)?;
            }
            out.write_str("</Gather>")
        }
        Verb::Redirect { url } if url.is_empty() => out.write_str("<Redirect/>"),
        Verb::Redirect { url } => write!(out, "<Redirect>{}</Redirect>", xml_escape(url)),
        Verb::Hangup => out.write_str("<Hangup/>"),
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

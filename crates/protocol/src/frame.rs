use crate::ProtocolEvent;

const DATA_PREFIX: &str = "data:";
const EVENT_PREFIX: &str = "event:";
const COMMENT_PREFIX: char = ':';
const DONE_PAYLOAD: &str = "[DONE]";
const END_TOKEN: &str = "<end>";
const UNKNOWN_ERROR: &str = "unknown error";

/// Tunables for [`FrameParser`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameOptions {
    sentinels: Vec<String>,
}

impl FrameOptions {
    /// The segment terminator the upstream service appends to payloads.
    pub const DEFAULT_SENTINEL: &'static str = "</chank>";

    /// Creates options without any sentinel.
    #[inline]
    pub fn without_sentinels() -> Self {
        Self { sentinels: vec![] }
    }

    /// Adds a sentinel. A payload is cut at the first sentinel it
    /// contains; the sentinel and the rest of the payload are dropped.
    #[inline]
    pub fn with_sentinel<S: Into<String>>(mut self, sentinel: S) -> Self {
        let sentinel = sentinel.into();
        if !sentinel.is_empty() && !self.sentinels.contains(&sentinel) {
            self.sentinels.push(sentinel);
        }
        self
    }

    /// Returns the configured sentinels.
    #[inline]
    pub fn sentinels(&self) -> &[String] {
        &self.sentinels
    }

    fn strip_sentinels<'a>(&self, payload: &'a str) -> &'a str {
        let cut = self
            .sentinels
            .iter()
            .filter_map(|s| payload.find(s.as_str()))
            .min();
        match cut {
            Some(idx) => &payload[..idx],
            None => payload,
        }
    }
}

impl Default for FrameOptions {
    #[inline]
    fn default() -> Self {
        Self::without_sentinels().with_sentinel(Self::DEFAULT_SENTINEL)
    }
}

/// An incremental parser for the line-framed answer stream.
///
/// Text is fed in arbitrary pieces. Only complete lines are ever
/// interpreted; the unterminated tail is carried over to the next call.
/// Once the stream has ended (or reported an error) the parser discards
/// everything it is given.
///
/// ```text
/// data: <payload>      content, `[DONE]` or `<end>` end the stream
/// event: error         error, message from the next `data:` line
/// event: end           ignored
/// <end>                end of stream
/// : comment            ignored
/// ```
#[derive(Clone, Debug, Default)]
pub struct FrameParser {
    options: FrameOptions,
    buf: String,
    // Start of the first line in `buf` that has not been parsed yet.
    pos: usize,
    eof: bool,
    // The event that terminated the stream is queued here when it has to
    // follow a content fragment from the same line.
    queued: Option<ProtocolEvent>,
    terminated: bool,
}

impl FrameParser {
    /// Creates a parser with the given options.
    #[inline]
    pub fn new(options: FrameOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Returns `true` once the stream has ended or reported an error.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Appends decoded text and returns the events it completes.
    pub fn feed(&mut self, text: &str) -> Events<'_> {
        self.push(text);
        Events { parser: self }
    }

    /// Marks the end of input and returns the remaining events.
    ///
    /// The trailing line is parsed even without a line terminator, since
    /// nothing more can be appended to it.
    pub fn finish(&mut self) -> Events<'_> {
        self.eof = true;
        Events { parser: self }
    }

    /// Appends decoded text without extracting anything.
    pub fn push(&mut self, text: &str) {
        if self.terminated || self.eof {
            if !text.is_empty() {
                trace!("discarding {} byte(s) after the end", text.len());
            }
            return;
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.push_str(text);
    }

    /// Extracts the next event from the buffered lines, if any.
    pub fn next_event(&mut self) -> Option<ProtocolEvent> {
        if let Some(event) = self.queued.take() {
            return Some(event);
        }

        while !self.terminated {
            let (start, end, next) = self.next_line()?;
            self.pos = next;

            let line = trim_cr(&self.buf[start..end]);
            let event = match classify(line, &self.options) {
                Line::Content(text) => {
                    Some(ProtocolEvent::ContentFragment(text))
                }
                Line::ContentThenEnd(text) => {
                    self.terminate();
                    self.queued = Some(ProtocolEvent::StreamEnded);
                    Some(ProtocolEvent::ContentFragment(text))
                }
                Line::End => {
                    self.terminate();
                    Some(ProtocolEvent::StreamEnded)
                }
                Line::Error => {
                    let message = self.take_error_message();
                    self.terminate();
                    Some(ProtocolEvent::ErrorReported(message))
                }
                Line::Ignored => None,
            };

            if event.is_some() {
                trace!("parsed event: {event:?}");
                return event;
            }
        }
        None
    }

    /// Finds the message for an `event: error` line among the complete
    /// lines that are already buffered. It never waits for more input.
    fn take_error_message(&mut self) -> String {
        while let Some((start, end, next)) = self.next_line() {
            self.pos = next;
            let line = trim_cr(&self.buf[start..end]);
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                let message = payload.trim();
                if !message.is_empty() {
                    return message.to_owned();
                }
                break;
            }
        }
        UNKNOWN_ERROR.to_owned()
    }

    /// Returns the bounds of the next complete line and the position right
    /// after it.
    fn next_line(&self) -> Option<(usize, usize, usize)> {
        let rest = &self.buf[self.pos..];
        match rest.find('\n') {
            Some(idx) => Some((self.pos, self.pos + idx, self.pos + idx + 1)),
            None if self.eof && !rest.is_empty() => {
                Some((self.pos, self.buf.len(), self.buf.len()))
            }
            None => None,
        }
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.buf.clear();
        self.pos = 0;
    }
}

enum Line {
    Content(String),
    ContentThenEnd(String),
    End,
    Error,
    Ignored,
}

fn classify(line: &str, options: &FrameOptions) -> Line {
    if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
        let payload = payload.trim_start();
        let (payload, ended) = match payload.find(END_TOKEN) {
            Some(idx) => (&payload[..idx], true),
            None => (payload, false),
        };
        let content = options.strip_sentinels(payload);
        if content == DONE_PAYLOAD {
            return Line::End;
        }
        return match (content.is_empty(), ended) {
            (true, true) => Line::End,
            (true, false) => Line::Ignored,
            (false, true) => Line::ContentThenEnd(content.to_owned()),
            (false, false) => Line::Content(content.to_owned()),
        };
    }

    if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
        return match name.trim() {
            "error" => Line::Error,
            "end" => Line::Ignored,
            other => {
                trace!("ignoring event `{other}`");
                Line::Ignored
            }
        };
    }

    if line.trim() == END_TOKEN {
        return Line::End;
    }
    if !line.is_empty() && !line.starts_with(COMMENT_PREFIX) {
        trace!("ignoring line: {line:?}");
    }
    Line::Ignored
}

#[inline]
fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// A lazy sequence of events, see [`FrameParser::feed`].
///
/// Events are extracted one line at a time as the iterator is advanced.
/// Dropping it early leaves the remaining lines buffered in the parser.
#[derive(Debug)]
pub struct Events<'a> {
    parser: &'a mut FrameParser,
}

impl Iterator for Events<'_> {
    type Item = ProtocolEvent;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProtocolEvent::*;

    fn parse_all(input: &str) -> Vec<ProtocolEvent> {
        let mut parser = FrameParser::default();
        let mut events: Vec<_> = parser.feed(input).collect();
        events.extend(parser.finish());
        events
    }

    fn fragment(text: &str) -> ProtocolEvent {
        ContentFragment(text.to_owned())
    }

    #[test]
    fn test_content_and_done() {
        assert_eq!(
            parse_all("data: Hello\n\ndata: World\n\ndata: [DONE]\n\n"),
            vec![fragment("Hello"), fragment("World"), StreamEnded]
        );
    }

    #[test]
    fn test_incomplete_line_is_held_back() {
        let mut parser = FrameParser::default();
        assert_eq!(parser.feed("data: Hel").next(), None);
        assert_eq!(parser.feed("lo").next(), None);
        let events: Vec<_> = parser.feed("\n").collect();
        assert_eq!(events, vec![fragment("Hello")]);
    }

    #[test]
    fn test_split_prefix() {
        let mut parser = FrameParser::default();
        assert_eq!(parser.feed("da").next(), None);
        assert_eq!(parser.feed("ta:").next(), None);
        assert_eq!(parser.feed(" hi\r").next(), None);
        let events: Vec<_> = parser.feed("\n").collect();
        assert_eq!(events, vec![fragment("hi")]);
    }

    #[test]
    fn test_sentinel_stripping() {
        assert_eq!(parse_all("data: foo</chank>bar\n"), vec![fragment("foo")]);
        assert_eq!(parse_all("data: </chank>\n"), vec![]);
    }

    #[test]
    fn test_done_with_sentinel() {
        assert_eq!(
            parse_all("data: a\ndata: [DONE]</chank>\ndata: b\n"),
            vec![fragment("a"), StreamEnded]
        );
        assert_eq!(parse_all("data: [DONE]<end>\n"), vec![StreamEnded]);
    }

    #[test]
    fn test_custom_sentinels() {
        let options = FrameOptions::without_sentinels()
            .with_sentinel("##")
            .with_sentinel("**");
        let mut parser = FrameParser::new(options);
        let events: Vec<_> = parser
            .feed("data: a</chank>b\ndata: c**d##e\n")
            .collect();
        assert_eq!(events, vec![fragment("a</chank>b"), fragment("c")]);
    }

    #[test]
    fn test_end_token() {
        assert_eq!(
            parse_all("data: last words<end>\ndata: ignored\n"),
            vec![fragment("last words"), StreamEnded]
        );
        assert_eq!(
            parse_all("data: a\n<end>\ndata: b\n"),
            vec![fragment("a"), StreamEnded]
        );
        assert_eq!(parse_all("data: <end>\n"), vec![StreamEnded]);
    }

    #[test]
    fn test_stream_ended_once() {
        let mut parser = FrameParser::default();
        let events: Vec<_> =
            parser.feed("data: x\ndata: [DONE]\n<end>\n").collect();
        assert_eq!(events, vec![fragment("x"), StreamEnded]);
        assert_eq!(parser.feed("data: [DONE]\n").next(), None);
        assert_eq!(parser.finish().next(), None);
        assert!(parser.is_terminated());
    }

    #[test]
    fn test_error_event() {
        assert_eq!(
            parse_all("event: error\ndata: rate limited\ndata: more\n"),
            vec![ErrorReported("rate limited".to_owned())]
        );
    }

    #[test]
    fn test_error_event_without_message_yet() {
        let mut parser = FrameParser::default();
        let events: Vec<_> = parser.feed("data: a\nevent: error\n").collect();
        assert_eq!(
            events,
            vec![fragment("a"), ErrorReported("unknown error".to_owned())]
        );
        assert_eq!(parser.feed("data: late message\n").next(), None);
    }

    #[test]
    fn test_ignored_lines() {
        assert_eq!(
            parse_all(
                ": keep-alive\nevent: end\nevent: progress\nretry: 10\n\n\
                 data:x\n"
            ),
            vec![fragment("x")]
        );
    }

    #[test]
    fn test_trailing_line_at_eof() {
        let mut parser = FrameParser::default();
        assert_eq!(parser.feed("data: tail").next(), None);
        let events: Vec<_> = parser.finish().collect();
        assert_eq!(events, vec![fragment("tail")]);
    }

    #[test]
    fn test_lazy_extraction() {
        let mut parser = FrameParser::default();
        let mut events = parser.feed("data: a\ndata: b\n");
        assert_eq!(events.next(), Some(fragment("a")));
        drop(events);
        // The second line is still buffered.
        assert_eq!(parser.feed("").collect::<Vec<_>>(), vec![fragment("b")]);
    }
}

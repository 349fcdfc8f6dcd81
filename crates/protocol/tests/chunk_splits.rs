use ragchat_protocol::{FrameParser, ProtocolEvent, Utf8Decoder};

const FRAMED: &str = "data: Hello\n\ndata: World\n\ndata: [DONE]\n\n";

/// Yields every way of cutting `len` bytes into at most three chunks.
fn cut_points(len: usize) -> impl Iterator<Item = Vec<usize>> {
    (0..=len).flat_map(move |a| {
        (a..=len).map(move |b| {
            let mut cuts = vec![0, a, b, len];
            cuts.dedup();
            cuts
        })
    })
}

fn split<'a>(bytes: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    cuts.windows(2).map(|w| &bytes[w[0]..w[1]]).collect()
}

/// Runs bytes through the decoder and parser, returning the joined content
/// and the number of end signals.
fn run(chunks: &[&[u8]]) -> (String, usize) {
    let mut decoder = Utf8Decoder::new();
    let mut parser = FrameParser::default();
    let mut content = String::new();
    let mut ended = 0;

    let mut apply = |event: ProtocolEvent| match event {
        ProtocolEvent::ContentFragment(text) => content.push_str(&text),
        ProtocolEvent::StreamEnded => ended += 1,
        ProtocolEvent::ErrorReported(msg) => panic!("unexpected error: {msg}"),
    };

    for chunk in chunks {
        let text = decoder.decode(chunk).unwrap();
        parser.feed(&text).for_each(&mut apply);
    }
    decoder.finish().unwrap();
    parser.finish().for_each(&mut apply);
    (content, ended)
}

#[test]
fn test_split_characters_decode_like_one_pass() {
    let text = "naïve 日本語 🦀 façade";
    let bytes = text.as_bytes();
    for cuts in cut_points(bytes.len()) {
        let mut decoder = Utf8Decoder::new();
        let decoded: String = split(bytes, &cuts)
            .into_iter()
            .map(|chunk| decoder.decode(chunk).unwrap())
            .collect();
        decoder.finish().unwrap();
        assert_eq!(decoded, text, "cuts: {cuts:?}");
    }
}

#[test]
fn test_split_markers_keep_content() {
    let bytes = FRAMED.as_bytes();
    for cuts in cut_points(bytes.len()) {
        let (content, ended) = run(&split(bytes, &cuts));
        assert_eq!(content, "HelloWorld", "cuts: {cuts:?}");
        assert_eq!(ended, 1, "cuts: {cuts:?}");
    }
}

#[test]
fn test_byte_by_byte() {
    let framed = "data: Grüße\n\ndata:  aus </chank>x\n\ndata: 東京<end>\n";
    let chunks: Vec<&[u8]> = framed.as_bytes().chunks(1).collect();
    let (content, ended) = run(&chunks);
    assert_eq!(content, "Grüßeaus 東京");
    assert_eq!(ended, 1);
}

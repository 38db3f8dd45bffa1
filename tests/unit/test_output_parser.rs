//! Unit tests for output classification
//!
//! Covers the CLIXML path, the plain-text fallback and ANSI handling as
//! seen through the public `OutputParser` API.

use psbridge::models::{StreamKind, DEFAULT_FG};
use psbridge::OutputParser;

const NS: &str = "http://schemas.microsoft.com/powershell/2004/04";

fn clixml(body: &str) -> String {
    format!(r#"#< CLIXML
<Objs Version="1.1.0.1" xmlns="{}">{}</Objs>"#, NS, body)
}

#[cfg(test)]
mod clixml_tests {
    use super::*;

    #[test]
    fn test_every_stream_kind_is_classified() {
        let body = [
            ("error", StreamKind::Error),
            ("warning", StreamKind::Warning),
            ("verbose", StreamKind::Verbose),
            ("debug", StreamKind::Debug),
            ("progress", StreamKind::Progress),
            ("information", StreamKind::Information),
        ]
        .iter()
        .enumerate()
        .map(|(i, (attr, _))| {
            format!(r#"<Obj S="{}" RefId="{}"><ToString>record {}</ToString></Obj>"#, attr, i, i)
        })
        .collect::<String>();

        let parser = OutputParser::new();
        let records = parser.parse(clixml(&body).as_bytes()).unwrap();

        let streams: Vec<_> = records.iter().map(|r| r.stream).collect();
        assert_eq!(
            streams,
            vec![
                StreamKind::Error,
                StreamKind::Warning,
                StreamKind::Verbose,
                StreamKind::Debug,
                StreamKind::Progress,
                StreamKind::Information,
            ]
        );
        assert_eq!(records[3].content, "record 3");
    }

    #[test]
    fn test_object_without_stream_attribute_is_output() {
        let parser = OutputParser::new();
        let records = parser
            .parse(clixml(r#"<Obj RefId="0"><ToString>hello</ToString></Obj>"#).as_bytes())
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream, StreamKind::Output);
        assert!(!records[0].is_error());
    }

    #[test]
    fn test_escaped_line_breaks_are_decoded() {
        let parser = OutputParser::new();
        let records = parser
            .parse(clixml(r#"<S S="Error">line one_x000A_line two_x000D__x000A_</S>"#).as_bytes())
            .unwrap();

        assert_eq!(records[0].stream, StreamKind::Error);
        assert_eq!(records[0].content, "line one\nline two");
    }

    #[test]
    fn test_empty_object_stream() {
        let parser = OutputParser::new();
        let records = parser.parse(clixml("").as_bytes()).unwrap();
        assert!(records.is_empty());
    }
}

#[cfg(test)]
mod fallback_tests {
    use super::*;

    #[test]
    fn test_plain_lines_become_output_records() {
        let parser = OutputParser::new();
        let records = parser.parse(b"alpha\r\n\r\nbeta\n").unwrap();

        let contents: Vec<_> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha", "beta"]);
        assert!(records.iter().all(|r| r.stream == StreamKind::Output));
    }

    #[test]
    fn test_malformed_xml_falls_back() {
        let parser = OutputParser::new();
        let records = parser.parse(b"<Objs><Obj S=\"error\">").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stream, StreamKind::Output);
        assert_eq!(records[0].content, "<Objs><Obj S=\"error\">");
    }

    #[test]
    fn test_foreign_root_falls_back() {
        let parser = OutputParser::new();
        assert!(parser.parse_clixml(b"<Foo/>").is_err());

        let records = parser.parse(b"<Foo/>").unwrap();
        assert_eq!(records[0].content, "<Foo/>");
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let parser = OutputParser::new();
        let records = parser.parse(&[b'f', 0xff, b'\n', b'g']).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "f\u{FFFD}");
        assert_eq!(records[1].content, "g");
    }
}

#[cfg(test)]
mod ansi_tests {
    use super::*;

    #[test]
    fn test_colored_line_is_formatted() {
        let parser = OutputParser::new();
        let records = parser.parse(b"\x1b[31mred\x1b[0m plain").unwrap();
        let record = &records[0];

        assert!(record.is_formatted);
        assert_eq!(record.ansi_segments.len(), 2);
        assert_eq!(record.ansi_segments[0].fg_color, 31);
        assert_eq!(record.ansi_segments[1].fg_color, DEFAULT_FG);

        assert_eq!(parser.format_output(record), "red plain");
        assert_eq!(
            parser.format_with_ansi(record),
            "\x1b[31mred\x1b[0m\x1b[37m plain\x1b[0m"
        );
    }

    #[test]
    fn test_unformatted_record_formats_verbatim() {
        let parser = OutputParser::new();
        let records = parser.parse(b"just text").unwrap();

        assert!(!records[0].is_formatted);
        assert_eq!(records[0].ansi_segments.len(), 1);
        assert_eq!(parser.format_with_ansi(&records[0]), "just text");
    }

    #[test]
    fn test_format_output_drops_joined_sequences() {
        let parser = OutputParser::new();
        let records = parser.parse(b"\x1b\x1b[31m[0mvisible").unwrap();
        let record = &records[0];

        assert!(record.is_formatted);
        assert_eq!(parser.format_output(record), "visible");
        assert_eq!(parser.format_output(record), parser.strip_ansi(&record.content));
    }

    #[test]
    fn test_strip_and_detect() {
        let parser = OutputParser::new();
        let text = "\x1b[1;32mok\x1b[0m";

        assert!(parser.has_ansi_codes(text));
        assert_eq!(parser.strip_ansi(text), "ok");
        assert!(!parser.has_ansi_codes("ok"));
    }

    #[test]
    fn test_stream_colors() {
        let parser = OutputParser::new();
        assert_eq!(parser.stream_color(StreamKind::Error), (91, 40));
        assert_eq!(parser.stream_color(StreamKind::Warning), (93, 40));
        assert_eq!(parser.stream_color(StreamKind::Output), (97, 40));
    }
}

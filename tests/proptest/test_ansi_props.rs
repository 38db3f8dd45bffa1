//! Property-based tests for ANSI decoding
//!
//! Re-synthesized segments must decode back to the same styled runs, and
//! stripping must be idempotent on arbitrary input.

use psbridge::ansi::{has_ansi_codes, parse_ansi, plain_text, render_segments, strip_ansi};
use psbridge::models::AnsiSegment;
use proptest::prelude::*;

fn fg_color() -> impl Strategy<Value = u8> {
    prop_oneof![30u8..=37, 90u8..=97]
}

fn bg_color() -> impl Strategy<Value = u8> {
    prop_oneof![40u8..=47, 100u8..=107]
}

prop_compose! {
    fn styled_segment()(
        text in "[a-zA-Z0-9 .,:-]{1,24}",
        fg_color in fg_color(),
        bg_color in bg_color(),
        bold in any::<bool>(),
        underline in any::<bool>(),
        italic in any::<bool>(),
    ) -> AnsiSegment {
        AnsiSegment { text, fg_color, bg_color, bold, underline, italic }
    }
}

proptest! {
    #[test]
    fn test_render_then_parse_round_trips(segments in prop::collection::vec(styled_segment(), 1..8)) {
        let rendered = render_segments(&segments);
        let decoded = parse_ansi(&rendered);

        prop_assert_eq!(decoded, segments);
    }

    #[test]
    fn test_strip_is_idempotent(s in "(\\PC|\x1b|\\[|\x1b\\[[0-9;]{0,6}m){0,40}") {
        let once = strip_ansi(&s);
        let twice = strip_ansi(&once);

        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn test_strip_matches_visible_text(segments in prop::collection::vec(styled_segment(), 1..8)) {
        let rendered = render_segments(&segments);

        prop_assert_eq!(strip_ansi(&rendered), plain_text(&segments));
        prop_assert!(!has_ansi_codes(&strip_ansi(&rendered)));
    }

    #[test]
    fn test_plain_text_is_single_segment(s in "[a-zA-Z0-9 ]{0,200}") {
        let segments = parse_ansi(&s);

        prop_assert_eq!(segments.len(), 1);
        prop_assert!(!segments[0].is_styled());
        prop_assert_eq!(&segments[0].text, &s);
    }

    #[test]
    fn test_parse_preserves_visible_text(s in "(\\PC|\x1b|\\[|\x1b\\[[0-9;]{0,6}m){0,40}") {
        let segments = parse_ansi(&s);
        prop_assert_eq!(plain_text(&segments), strip_ansi(&s));
        for seg in &segments {
            prop_assert_eq!(strip_ansi(&seg.text), seg.text.clone());
        }
    }
}

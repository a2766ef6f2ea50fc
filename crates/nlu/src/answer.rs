use serde::Deserialize;

/// Canonical text the NLU service answers with when it cannot resolve an
/// utterance. Classification is substring containment over this marker.
pub const FAILURE_MARKER: &str = "Oh No, looks like something is wrong";

/// Marker signalling a partial/ambiguous match; such replies carry several
/// candidate answers that are rendered joined, in original order.
pub const PARTIAL_MARKER: &str = "I am not sure I understand";

pub const ANSWER_SEPARATOR: &str = ", ";

/// Reply rendered when the NLU call itself fails. Contains `FAILURE_MARKER`,
/// so a dead transport flows into the same retry/hand-off path as a service
/// that answered "unmatched".
pub const FAILURE_REPLY: &str = "Oh No, looks like something is wrong.";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NluReply {
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// Render a decoded reply into the single text handed back to the platform:
/// the first answer's text, or the join of all answer texts when partial
/// understanding is signalled. An empty answer set is a broken upstream and
/// renders the canned failure reply.
pub fn render_reply(reply: &NluReply) -> String {
    let Some(first) = reply.answers.first() else {
        return FAILURE_REPLY.to_owned();
    };

    if reply.answers.iter().any(|answer| answer.text.contains(PARTIAL_MARKER)) {
        reply
            .answers
            .iter()
            .map(|answer| answer.text.as_str())
            .collect::<Vec<_>>()
            .join(ANSWER_SEPARATOR)
    } else {
        first.text.clone()
    }
}

/// Whether a rendered reply means the service failed to resolve the utterance.
pub fn is_unmatched(reply_text: &str) -> bool {
    reply_text.contains(FAILURE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::{is_unmatched, render_reply, Answer, NluReply, FAILURE_MARKER, FAILURE_REPLY};

    fn reply(texts: &[&str]) -> NluReply {
        NluReply { answers: texts.iter().map(|text| Answer { text: (*text).to_owned() }).collect() }
    }

    #[test]
    fn renders_the_first_answer_on_a_full_match() {
        let rendered = render_reply(&reply(&["Your order ships tomorrow.", "Anything else?"]));
        assert_eq!(rendered, "Your order ships tomorrow.");
    }

    #[test]
    fn partial_match_joins_all_answers_in_original_order() {
        let rendered = render_reply(&reply(&[
            "I am not sure I understand: did you mean billing",
            "or shipping?",
        ]));
        assert_eq!(rendered, "I am not sure I understand: did you mean billing, or shipping?");
    }

    #[test]
    fn single_partial_answer_renders_as_its_own_text() {
        let rendered = render_reply(&reply(&["I am not sure I understand: A or B?"]));
        assert_eq!(rendered, "I am not sure I understand: A or B?");
    }

    #[test]
    fn empty_answer_set_renders_the_canned_failure_reply() {
        assert_eq!(render_reply(&NluReply::default()), FAILURE_REPLY);
    }

    #[test]
    fn unmatched_classification_is_substring_containment() {
        assert!(is_unmatched(FAILURE_MARKER));
        assert!(is_unmatched(&format!("Sorry. {FAILURE_MARKER} Try later.")));
        assert!(!is_unmatched("Your order ships tomorrow."));
    }

    #[test]
    fn the_canned_failure_reply_classifies_as_unmatched() {
        assert!(is_unmatched(FAILURE_REPLY));
    }

    #[test]
    fn wire_shape_decodes_answers_array() {
        let reply: NluReply =
            serde_json::from_str(r#"{"answers":[{"text":"hello"},{"text":"there"}]}"#)
                .expect("reply should decode");
        assert_eq!(reply.answers.len(), 2);
        assert_eq!(reply.answers[0].text, "hello");
    }
}

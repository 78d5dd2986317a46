use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

fn fragment_config(context: &[&str]) -> Config {
    let mut config = Config::default();
    config.set_feature("balance-tags/document-fragment", true).unwrap();
    config
        .set_property("fragment-context-stack", &context.join(" "))
        .unwrap();
    config
}

fn dump(html: &str, config: Config) -> Vec<String> {
    let mut reader = Reader::with_config(html.as_bytes(), config);
    let mut out = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => out.push(format!("<{}>", name.local)),
            Event::End { name } => out.push(format!("</{}>", name.local)),
            Event::Text(t) => out.push(format!("'{}'", t)),
            Event::EndDocument => return out,
            _ => {}
        }
    }
}

#[test]
fn table_context_synthesizes_tbody() {
    let events = dump(
        "<tr><td>hi</td></tr>",
        fragment_config(&["html", "body", "table"]),
    );
    assert_eq!(
        events,
        ["<tbody>", "<tr>", "<td>", "'hi'", "</td>", "</tr>", "</tbody>"]
    );
}

#[test]
fn tbody_context_needs_no_synthesis() {
    let events = dump(
        "<tr><td>hi</td></tr>",
        fragment_config(&["html", "body", "table", "tbody"]),
    );
    assert_eq!(events, ["<tr>", "<td>", "'hi'", "</td>", "</tr>"]);
}

#[test]
fn fragment_mode_never_synthesizes_document_structure() {
    let events = dump("<p>one</p>two", fragment_config(&["html", "body", "div"]));
    assert_eq!(events, ["<p>", "'one'", "</p>", "'two'"]);
}

#[test]
fn bare_text_fragment_passes_through() {
    let events = dump("just text", fragment_config(&["html", "body"]));
    assert_eq!(events, ["'just text'"]);
}

#[test]
fn end_tags_for_context_elements_are_ignored() {
    // the seeded </table> is not part of the fragment's own stream
    let events = dump(
        "<td>x</td></table>",
        fragment_config(&["html", "body", "table", "tbody", "tr"]),
    );
    assert_eq!(events, ["<td>", "'x'", "</td>"]);
}

#[test]
fn unclosed_fragment_content_is_closed_at_end() {
    let events = dump(
        "<li>one<li>two",
        fragment_config(&["html", "body", "ul"]),
    );
    assert_eq!(
        events,
        ["<li>", "'one'", "</li>", "<li>", "'two'", "</li>"]
    );
}

#[test]
fn fragment_without_context_balances_locally() {
    let mut config = Config::default();
    config.set_feature("balance-tags/document-fragment", true).unwrap();
    let events = dump("<b>x<i>y", config);
    assert_eq!(events, ["<b>", "'x'", "<i>", "'y'", "</i>", "</b>"]);
}

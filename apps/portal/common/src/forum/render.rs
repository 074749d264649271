use super::controller::{ForumPage, ForumScreen, TopicSummary};
use super::{ForumTopic, format_timestamp};
use crate::html::{escape, layout, notices, paragraphs};
use entity::Post;

pub fn render_page(page: &ForumPage) -> String {
    let (title, body) = match &page.screen {
        ForumScreen::Topics(topics) => ("Forum Topics", topic_list(topics)),
        ForumScreen::Thread { topic, can_reply } => (topic.title.as_str(), thread(topic, *can_reply)),
        ForumScreen::CreateTopic { username_missing } => {
            ("Start a New Discussion", create_form(*username_missing))
        }
    };

    let body = format!("{}\n{}", notices(&page.notices), body);
    layout(title, Some(&sidebar(page)), &body)
}

fn sidebar(page: &ForumPage) -> String {
    let create_button = if page.can_create_topic {
        r#"<button type="submit">Create New Topic</button>"#.to_string()
    } else {
        r#"<button type="submit" disabled title="Enter a username to create topics.">Create New Topic</button>"#
            .to_string()
    };

    format!(
        r#"<h2>Craft Forum</h2>
<hr>
<h3>Your Details</h3>
<form method="post" action="/username">
<label>Enter your username <input type="text" name="username" value="{}"></label>
<button type="submit">Save</button>
</form>
<hr>
<h3>Actions</h3>
<form method="post" action="/view/topics"><button type="submit">View All Topics</button></form>
<form method="post" action="/view/create">{}</form>
<hr>
<p class="caption">Part of the Cross-Generation Knowledge Transfer Platform</p>"#,
        escape(&page.username),
        create_button
    )
}

fn topic_list(topics: &[TopicSummary]) -> String {
    let mut out = String::from(
        "<h1>Forum Topics</h1>\n<p>Browse questions and discussions on various techniques.</p>\n<hr>\n",
    );

    if topics.is_empty() {
        out.push_str(
            r#"<div class="notice notice-info">No topics yet, or failed to load topics. Be the first to create one!</div>"#,
        );
        return out;
    }

    for topic in topics {
        out.push_str(&format!(
            r#"<div class="card">
<h3>{}</h3>
<p class="caption">Started by: <b>{}</b> on {}</p>
<p>Replies: {}</p>
<form method="post" action="/view/thread/{}"><button type="submit">View Thread</button></form>
</div>
"#,
            escape(&topic.title),
            escape(&topic.author),
            format_timestamp(&topic.created_at),
            topic.reply_count,
            escape(&topic.id)
        ));
    }
    out
}

fn post_card(post: &Post, label: &str) -> String {
    format!(
        r#"<div class="card">
<span class="stamp">{}</span>
<p><b>{}</b>{}</p>
<div>{}</div>
</div>
"#,
        format_timestamp(&post.created_at),
        escape(&post.author),
        label,
        paragraphs(&post.content)
    )
}

fn thread(topic: &ForumTopic, can_reply: bool) -> String {
    let mut out = format!("<h1>{}</h1>\n", escape(&topic.title));

    match topic.original_post() {
        Some(op) => out.push_str(&post_card(op, " (OP)")),
        None => out.push_str(
            r#"<div class="notice notice-warning">Original post not found for this topic.</div>"#,
        ),
    }
    out.push_str("<hr>\n");

    let replies = topic.replies();
    if !replies.is_empty() {
        out.push_str(&format!("<h2>Replies ({})</h2>\n", replies.len()));
        for reply in replies {
            out.push_str(&post_card(reply, ""));
        }
        out.push_str("<hr>\n");
    }

    out.push_str("<h2>Add Your Reply</h2>\n");
    if can_reply {
        out.push_str(
            r#"<form method="post" action="/reply">
<label>Your message:<br><textarea name="content" rows="6" placeholder="Share your insights or ask for clarification..."></textarea></label>
<button type="submit">Post Reply</button>
</form>"#,
        );
    } else {
        out.push_str(
            r#"<div class="notice notice-warning">Please enter your username in the sidebar to reply.</div>"#,
        );
    }
    out
}

fn create_form(username_missing: bool) -> String {
    let mut out = String::from(
        "<h1>Start a New Discussion</h1>\n<p>Ask a question or share a technique.</p>\n<hr>\n",
    );

    if username_missing {
        out.push_str(
            r#"<div class="notice notice-error">Error: Username is required to create a topic. Please enter it in the sidebar.</div>"#,
        );
        return out;
    }

    out.push_str(
        r#"<form method="post" action="/topics">
<label>Topic Title / Question:<br><input type="text" name="title" placeholder="e.g., How to achieve a perfect dovetail joint?"></label>
<label>Your first post (provide details):<br><textarea name="content" rows="8" placeholder="Describe the technique, problem, or question in detail..."></textarea></label>
<button type="submit">Create Topic</button>
</form>"#,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::testing::at;
    use crate::notice::Notice;

    fn page(screen: ForumScreen) -> ForumPage {
        ForumPage {
            notices: vec![],
            username: "ana".into(),
            can_create_topic: true,
            screen,
        }
    }

    #[test]
    fn test_topic_list_shows_reply_count() {
        let html = render_page(&page(ForumScreen::Topics(vec![TopicSummary {
            id: "topic_1".into(),
            title: "Glaze <recipes>".into(),
            author: "ana".into(),
            created_at: at(0),
            reply_count: 3,
        }])));

        assert!(html.contains("Glaze &lt;recipes&gt;"));
        assert!(html.contains("Replies: 3"));
        assert!(html.contains(r#"action="/view/thread/topic_1""#));
        assert!(html.contains("2025-04-12 01:00 AM (UTC)"));
    }

    #[test]
    fn test_thread_without_posts_warns() {
        let topic = ForumTopic {
            id: "topic_1".into(),
            title: "Empty".into(),
            author: "ana".into(),
            created_at: at(0),
            posts: vec![],
        };
        let html = render_page(&page(ForumScreen::Thread {
            topic,
            can_reply: false,
        }));

        assert!(html.contains("Original post not found for this topic."));
        assert!(!html.contains("Replies ("));
        assert!(html.contains("Please enter your username in the sidebar to reply."));
    }

    #[test]
    fn test_disabled_create_button_and_notices() {
        let mut p = page(ForumScreen::CreateTopic {
            username_missing: true,
        });
        p.can_create_topic = false;
        p.notices.push(Notice::warning("Enter a username to create topics."));

        let html = render_page(&p);

        assert!(html.contains("disabled"));
        assert!(html.contains("notice-warning"));
        assert!(html.contains("Username is required to create a topic"));
        assert!(!html.contains(r#"action="/topics""#));
    }
}

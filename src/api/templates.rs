//! Server rendered pages using Handlebars. Everything interpolated
//! with `{{ }}` is HTML escaped, model output included, so message
//! bodies are structured as display nodes rather than raw markup.

use std::fmt;

use handlebars::{Handlebars, handlebars_helper};

// `@index` starts at 0 but sources are numbered from 1
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

#[derive(Debug)]
pub enum Page {
    Chat,
    Login,
    Register,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const LAYOUT_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Gemini Study Tutor</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 0 auto; padding: 1rem; }
.message { margin: 0.75rem 0; padding: 0.5rem 0.75rem; border-radius: 0.5rem; }
.message.user { background: #e8f0fe; text-align: right; }
.message.model { background: #f1f3f4; }
.sources { font-size: 0.8rem; }
.banner { background: #fff4e5; padding: 0.5rem; }
.warning { background: #fdecea; padding: 0.5rem; }
.error { color: #b00020; }
</style>
</head>
<body>
"#;

const LAYOUT_FOOT: &str = "</body>\n</html>\n";

const CHAT_PAGE: &str = r#"{{#if ready}}
<header>
  <h1>Gemini Study Tutor</h1>
  {{#if guest}}
  <a href="/login">Log in</a>
  {{else}}
  <span>Logged in as {{user_label}}</span>
  <form method="post" action="/logout"><button type="submit">Log out</button></form>
  {{/if}}
</header>
{{#if guest}}
<p class="banner">You are in Guest Mode — chat history won’t be saved.</p>
{{/if}}
{{#if persistence_failed}}
<p class="warning">Some messages could not be saved to your history.</p>
{{/if}}
<main>
  {{#if empty}}
  <p>Ask your Gemini Tutor about academic topics.</p>
  {{/if}}
  {{#each messages}}
  <div class="message {{role}}"{{#if latest}} id="latest"{{/if}}>
    <div class="body">{{#each nodes}}{{#if line_break}}<br>{{else}}{{#if strong}}<strong>{{text}}</strong>{{else}}{{text}}{{/if}}{{/if}}{{/each}}</div>
    {{#if sources}}
    <ul class="sources">
      {{#each sources}}
      <li><a href="{{uri}}" target="_blank" rel="noopener noreferrer">{{#if title}}{{title}}{{else}}Source {{inc @index}}{{/if}}</a></li>
      {{/each}}
    </ul>
    {{/if}}
  </div>
  {{/each}}
  {{#if loading}}
  <p class="thinking">Tutor is thinking...</p>
  {{/if}}
</main>
<form method="post" action="/chat#latest">
  <input type="text" name="text" value="{{draft}}" placeholder="Ask a study question" autofocus>
  <button type="submit"{{#if loading}} disabled{{/if}}>Send</button>
</form>
{{else}}
<p>Loading Study Tutor...</p>
{{/if}}
"#;

const LOGIN_PAGE: &str = r#"<h1>Log in</h1>
{{#if error}}<p class="error">{{error}}</p>{{/if}}
<form method="post" action="/login">
  <input type="email" name="email" value="{{email}}" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password" required>
  <button type="submit">Log in</button>
</form>
<p>No account? <a href="/register">Register</a> or <a href="/chat">continue as a guest</a>.</p>
"#;

const REGISTER_PAGE: &str = r#"<h1>Register</h1>
{{#if error}}<p class="error">{{error}}</p>{{/if}}
<form method="post" action="/register">
  <input type="email" name="email" value="{{email}}" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password (6+ characters)" required>
  <button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Log in</a>.</p>
"#;

fn page(body: &str) -> String {
    format!("{}{}{}", LAYOUT_HEAD, body, LAYOUT_FOOT)
}

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_helper("inc", Box::new(inc));
    registry
        .register_template_string(&Page::Chat.to_string(), page(CHAT_PAGE))
        .expect("Failed to register template");
    registry
        .register_template_string(&Page::Login.to_string(), page(LOGIN_PAGE))
        .expect("Failed to register template");
    registry
        .register_template_string(&Page::Register.to_string(), page(REGISTER_PAGE))
        .expect("Failed to register template");
    registry
}

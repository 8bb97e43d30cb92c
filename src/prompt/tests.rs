use super::*;

#[test]
fn chat_prompt_has_system_then_user() {
    let messages = PromptTemplate::chat()
        .format_messages(&[("language", "Spanish"), ("user_text", "How are you?")])
        .expect("all variables supplied");

    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0],
        Message::system("You are a helpful chatbot. Respond in Spanish.")
    );
    assert_eq!(messages[1], Message::user("How are you?"));
}

#[test]
fn user_text_is_passed_verbatim() {
    let inputs = [
        "",
        "  leading and trailing  ",
        "multi\nline\n\ntext",
        "braces {language} and {{escaped}} stay as typed",
        "unicode: नमस्ते, ¿qué tal?",
    ];

    for user_text in inputs {
        for language in ["English", "Spanish", "Hindi"] {
            let messages = PromptTemplate::chat()
                .format_messages(&[("language", language), ("user_text", user_text)])
                .expect("all variables supplied");
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].role, Role::User);
            assert_eq!(messages[1].content, user_text);
        }
    }
}

#[test]
fn rag_prompt_embeds_context() {
    let context = "Paris is the capital of France.\n\nBerlin is the capital of Germany.";
    let messages = PromptTemplate::rag()
        .format_messages(&[("context", context), ("user_text", "Capital of France?")])
        .expect("all variables supplied");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains(context));
    assert!(messages[0].content.ends_with(&format!("Context:\n{context}")));
    assert!(messages[0].content.starts_with("You are a helpful assistant."));
    assert_eq!(messages[1].content, "Capital of France?");
}

#[test]
fn missing_variable_is_reported_by_name() {
    let err = PromptTemplate::rag()
        .format_messages(&[("user_text", "question")])
        .expect_err("context is missing");

    match err {
        RagError::MissingVariable(name) => assert_eq!(name, "context"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = PromptTemplate::chat()
        .format_messages(&[("language", "English")])
        .expect_err("user_text is missing");
    assert!(matches!(err, RagError::MissingVariable(name) if name == "user_text"));
}

#[test]
fn extra_variables_are_ignored() {
    let messages = PromptTemplate::chat()
        .format_messages(&[
            ("language", "Hindi"),
            ("user_text", "hi"),
            ("context", "unused"),
        ])
        .expect("extra variables are fine");
    assert!(!messages[0].content.contains("unused"));
}

#[test]
fn escaped_braces_render_literally() {
    let template = PromptTemplate::new("Reply as JSON like {{\"lang\": \"{language}\"}}", "{q}")
        .expect("template parses");

    let messages = template
        .format_messages(&[("language", "en"), ("q", "ok")])
        .expect("all variables supplied");
    assert_eq!(messages[0].content, "Reply as JSON like {\"lang\": \"en\"}");
}

#[test]
fn input_variables_are_collected() {
    let chat_template = PromptTemplate::chat();
    let chat: Vec<&str> = chat_template.input_variables().into_iter().collect();
    assert_eq!(chat, ["language", "user_text"]);

    let rag_template = PromptTemplate::rag();
    let rag: Vec<&str> = rag_template.input_variables().into_iter().collect();
    assert_eq!(rag, ["context", "user_text"]);
}

#[test]
fn values_are_not_expanded_twice() {
    let messages = PromptTemplate::rag()
        .format_messages(&[("context", "{user_text}"), ("user_text", "q")])
        .expect("all variables supplied");
    assert!(messages[0].content.ends_with("Context:\n{user_text}"));
}

#[test]
fn message_serializes_with_lowercase_role() {
    let json = serde_json::to_string(&Message::assistant("hello")).expect("serializes");
    assert_eq!(json, r#"{"role":"assistant","content":"hello"}"#);
}

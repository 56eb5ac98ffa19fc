//! Rule-based replies for when no gateway is configured or a call fails.
//!
//! First matching bucket wins; the default is a generic encouragement, so
//! the engine always has something to say.

/// Static reply for a message. Callers mark the result `fallback: true`.
pub fn static_reply(message: &str) -> String {
    let text = message.to_lowercase();

    if text.contains("hello") || text.contains("hi ") || text == "hi" {
        return "Hello! I'm Rita, your study assistant. How can I help you with your \
studies today?"
            .to_string();
    }
    if text.contains("help") {
        return "I'm here to help! You can ask me questions about your subjects, request \
study tips, or get guidance on quiz preparation. What would you like to know?"
            .to_string();
    }
    if text.contains("math") {
        return "Mathematics can be challenging, but with practice it becomes easier! Try \
breaking down complex problems into smaller steps, practice regularly, and don't hesitate \
to ask for help when needed."
            .to_string();
    }
    if text.contains("english") {
        return "English language skills improve with reading and practice! Try reading \
different types of texts, practice writing regularly, and focus on grammar fundamentals."
            .to_string();
    }
    if text.contains("study") || text.contains("learn") {
        return "Here are some effective study tips: 1) Create a study schedule, 2) Take \
regular breaks, 3) Practice active recall, 4) Form study groups, 5) Use different learning \
methods. What subject are you focusing on?"
            .to_string();
    }
    if text.contains("exam") || text.contains("worried") || text.contains("nervous") {
        return "Feeling nervous before an exam is completely normal. Build a revision \
timetable, practise past questions under timed conditions, and rest well the night before. \
You are better prepared than you think!"
            .to_string();
    }

    "Thank you for your message! Ask me about any subject, share how your preparation is \
going, or request study tips. I'm here to support your UTME, WAEC and NECO journey."
        .to_string()
}

//! Built-in demo question bank.
//!
//! The bank is the last tier of every sourcing chain: it never fails and
//! always returns exactly the requested number of questions. Templates are
//! grouped into keyword buckets matched against the subject name; subjects
//! that match no bucket fall back to generic study-skills templates with the
//! subject name interpolated into the stem.

use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::model::{Answer, Difficulty, Question, QuestionSource};

struct Template {
    stem: &'static str,
    options: [&'static str; 4],
    correct: Answer,
    explanation: &'static str,
    difficulty: Difficulty,
}

static MATH: &[Template] = &[
    Template {
        stem: "What is 12 + 15?",
        options: ["25", "26", "27", "28"],
        correct: Answer::C,
        explanation: "12 + 15 = 27.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "What is 9 \u{d7} 6?",
        options: ["52", "54", "56", "58"],
        correct: Answer::B,
        explanation: "9 multiplied by 6 is 54.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Solve for x: 3x - 7 = 14.",
        options: ["5", "6", "7", "8"],
        correct: Answer::C,
        explanation: "Adding 7 to both sides gives 3x = 21, so x = 7.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "What is the value of 2 raised to the power 5?",
        options: ["16", "32", "64", "24"],
        correct: Answer::B,
        explanation: "2 \u{d7} 2 \u{d7} 2 \u{d7} 2 \u{d7} 2 = 32.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "What is the sum of the interior angles of a hexagon?",
        options: ["540\u{b0}", "620\u{b0}", "720\u{b0}", "900\u{b0}"],
        correct: Answer::C,
        explanation: "(6 - 2) \u{d7} 180\u{b0} = 720\u{b0}.",
        difficulty: Difficulty::Hard,
    },
    Template {
        stem: "If y = 2x + 1 and y = 9, what is the value of x squared?",
        options: ["9", "16", "25", "4"],
        correct: Answer::B,
        explanation: "2x + 1 = 9 gives x = 4, and 4 squared is 16.",
        difficulty: Difficulty::Hard,
    },
];

static ENGLISH: &[Template] = &[
    Template {
        stem: "Choose the correct plural form of 'child'.",
        options: ["Childs", "Children", "Childes", "Childrens"],
        correct: Answer::B,
        explanation: "'Child' has the irregular plural 'children'.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Which word is a synonym of 'happy'?",
        options: ["Sad", "Joyful", "Angry", "Tired"],
        correct: Answer::B,
        explanation: "'Joyful' means feeling or expressing happiness.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Identify the adverb in: 'She sang beautifully at the concert.'",
        options: ["She", "sang", "beautifully", "concert"],
        correct: Answer::C,
        explanation: "'Beautifully' modifies the verb 'sang'.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "Choose the correctly punctuated sentence.",
        options: [
            "Its raining outside.",
            "It's raining outside.",
            "Its' raining outside.",
            "It is' raining outside.",
        ],
        correct: Answer::B,
        explanation: "'It's' is the contraction of 'it is'.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "What figure of speech is used in 'The classroom was a zoo'?",
        options: ["Simile", "Metaphor", "Hyperbole", "Personification"],
        correct: Answer::B,
        explanation: "The classroom is directly called a zoo, which is a metaphor.",
        difficulty: Difficulty::Hard,
    },
    Template {
        stem: "Choose the word opposite in meaning to 'transparent'.",
        options: ["Clear", "Opaque", "Bright", "Visible"],
        correct: Answer::B,
        explanation: "'Opaque' means impossible to see through.",
        difficulty: Difficulty::Hard,
    },
];

static SCIENCE: &[Template] = &[
    Template {
        stem: "Water is composed of hydrogen and which other element?",
        options: ["Nitrogen", "Oxygen", "Carbon", "Helium"],
        correct: Answer::B,
        explanation: "A water molecule is two hydrogen atoms bonded to one oxygen atom.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Which organ pumps blood around the human body?",
        options: ["Liver", "Brain", "Heart", "Kidney"],
        correct: Answer::C,
        explanation: "The heart drives blood through the circulatory system.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "What is the process by which green plants make their own food?",
        options: ["Respiration", "Photosynthesis", "Digestion", "Transpiration"],
        correct: Answer::B,
        explanation: "Photosynthesis converts sunlight, water and carbon dioxide into glucose.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "Which gas do plants absorb from the atmosphere for photosynthesis?",
        options: ["Oxygen", "Carbon dioxide", "Nitrogen", "Hydrogen"],
        correct: Answer::B,
        explanation: "Plants take in carbon dioxide and release oxygen.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "What is the atomic number of carbon?",
        options: ["4", "6", "8", "12"],
        correct: Answer::B,
        explanation: "Carbon has six protons, so its atomic number is 6.",
        difficulty: Difficulty::Hard,
    },
    Template {
        stem: "Which part of the cell controls its activities?",
        options: ["Cytoplasm", "Cell wall", "Nucleus", "Vacuole"],
        correct: Answer::C,
        explanation: "The nucleus holds the genetic material that directs the cell.",
        difficulty: Difficulty::Hard,
    },
];

static GEOGRAPHY: &[Template] = &[
    Template {
        stem: "What is the capital city of Nigeria?",
        options: ["Lagos", "Abuja", "Kano", "Ibadan"],
        correct: Answer::B,
        explanation: "Abuja became the capital of Nigeria in 1991.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Which is the largest continent by land area?",
        options: ["Africa", "Asia", "Europe", "South America"],
        correct: Answer::B,
        explanation: "Asia covers about thirty percent of the world's land area.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Which river is the longest in Africa?",
        options: ["Niger", "Congo", "Nile", "Zambezi"],
        correct: Answer::C,
        explanation: "The Nile runs about 6,650 kilometres from its source to the Mediterranean.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "Which imaginary line divides the Earth into Northern and Southern hemispheres?",
        options: ["Prime Meridian", "Equator", "Tropic of Cancer", "Arctic Circle"],
        correct: Answer::B,
        explanation: "The Equator lies at latitude zero and splits the hemispheres.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "Which Nigerian state is known as the 'Centre of Excellence'?",
        options: ["Rivers", "Lagos", "Kaduna", "Enugu"],
        correct: Answer::B,
        explanation: "'Centre of Excellence' is the slogan of Lagos State.",
        difficulty: Difficulty::Hard,
    },
];

static HISTORY: &[Template] = &[
    Template {
        stem: "In which year did Nigeria gain independence?",
        options: ["1957", "1960", "1963", "1966"],
        correct: Answer::B,
        explanation: "Nigeria became independent from Britain on 1 October 1960.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Which organization did Nigeria join at independence in 1960?",
        options: ["United Nations", "European Union", "NATO", "Warsaw Pact"],
        correct: Answer::A,
        explanation: "Nigeria was admitted to the United Nations in October 1960.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "Who was Nigeria's first president?",
        options: ["Nnamdi Azikiwe", "Tafawa Balewa", "Obafemi Awolowo", "Yakubu Gowon"],
        correct: Answer::A,
        explanation: "Nnamdi Azikiwe became president when Nigeria became a republic.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "In which year did Nigeria become a republic?",
        options: ["1960", "1963", "1970", "1979"],
        correct: Answer::B,
        explanation: "Nigeria adopted a republican constitution in 1963.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "The Berlin Conference that partitioned Africa was held in which years?",
        options: ["1884-1885", "1890-1891", "1900-1901", "1870-1871"],
        correct: Answer::A,
        explanation: "European powers met in Berlin between 1884 and 1885.",
        difficulty: Difficulty::Hard,
    },
];

static GENERIC: &[Template] = &[
    Template {
        stem: "Which study technique is most effective for mastering {subject}?",
        options: [
            "Regular practice with past questions",
            "Reading the textbook once before the exam",
            "Memorizing without understanding",
            "Skipping difficult topics",
        ],
        correct: Answer::A,
        explanation: "Consistent practice with past questions builds lasting mastery of {subject}.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "When you meet a difficult {subject} question in an exam, you should:",
        options: [
            "Panic and give up",
            "Skip it and return to it later",
            "Spend all your time on it",
            "Answer without reading it",
        ],
        correct: Answer::B,
        explanation: "Moving on protects your time; return to hard questions at the end.",
        difficulty: Difficulty::Easy,
    },
    Template {
        stem: "A student preparing {subject} for an examination should first:",
        options: [
            "Review the syllabus and plan the topics",
            "Study only the night before",
            "Avoid asking questions",
            "Focus on one easy topic",
        ],
        correct: Answer::A,
        explanation: "The syllabus shows exactly what {subject} topics the exam can draw from.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "Which habit improves long-term retention in {subject}?",
        options: [
            "Spaced revision over several weeks",
            "Cramming in one sitting",
            "Passive re-reading",
            "Studying without breaks",
        ],
        correct: Answer::A,
        explanation: "Spacing revision sessions strengthens recall far more than cramming.",
        difficulty: Difficulty::Medium,
    },
    Template {
        stem: "The best way to check your understanding of a {subject} topic is to:",
        options: [
            "Explain it in your own words",
            "Re-read the textbook silently",
            "Highlight every sentence",
            "Copy notes word for word",
        ],
        correct: Answer::A,
        explanation: "If you can explain a topic clearly you have truly understood it.",
        difficulty: Difficulty::Hard,
    },
];

/// Pick the template bucket for a subject name. The second element is true
/// when the generic bucket was chosen and `{subject}` needs interpolating.
fn bucket_for(subject: &str) -> (&'static [Template], bool) {
    let name = subject.to_ascii_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| name.contains(w));
    if matches(&["math", "arithmetic", "algebra"]) {
        (MATH, false)
    } else if matches(&["english", "language"]) {
        (ENGLISH, false)
    } else if matches(&["science", "biology", "chemistry", "physics"]) {
        (SCIENCE, false)
    } else if matches(&["geography", "social"]) {
        (GEOGRAPHY, false)
    } else if matches(&["history"]) {
        (HISTORY, false)
    } else {
        (GENERIC, true)
    }
}

/// Produce exactly `count` demo questions for a subject.
///
/// Templates are drawn without replacement in a shuffled order; once the
/// bucket is exhausted the order repeats with a "Regarding {subject}:"
/// prefix so reused stems are not byte-identical to the originals. A
/// difficulty of `Some(d)` stamps every question `d`; `None` keeps each
/// template's own tag.
pub fn demo_questions(subject: &str, count: usize, difficulty: Option<Difficulty>) -> Vec<Question> {
    let (templates, generic) = bucket_for(subject);
    let mut order: Vec<usize> = (0..templates.len()).collect();
    order.shuffle(&mut rand::thread_rng());

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let template = &templates[order[i % order.len()]];
        let reused = i >= order.len();
        out.push(instantiate(template, subject, generic, reused, difficulty));
    }
    out
}

fn instantiate(
    template: &Template,
    subject: &str,
    generic: bool,
    reused: bool,
    difficulty: Option<Difficulty>,
) -> Question {
    let mut stem = if generic {
        template.stem.replace("{subject}", subject)
    } else {
        template.stem.to_string()
    };
    if reused {
        stem = format!("Regarding {subject}: {stem}");
    }
    let explanation = if generic {
        template.explanation.replace("{subject}", subject)
    } else {
        template.explanation.to_string()
    };
    Question {
        id: format!("demo_{}", Uuid::new_v4()),
        subject_id: None,
        stem,
        options: template.options.map(str::to_string),
        correct: template.correct,
        explanation,
        difficulty: difficulty.unwrap_or(template.difficulty),
        source: QuestionSource::Demo,
        image: None,
    }
}

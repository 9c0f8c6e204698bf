//! Built-in question sets. They guarantee the app is playable without any
//! external config.

use crate::domain::Question;

fn q(text: &str, options: &[&str], answer: &str) -> Question {
  Question {
    text: text.into(),
    options: options.iter().map(|o| o.to_string()).collect(),
    correct_answer: answer.into(),
  }
}

/// (category name, questions) pairs.
pub fn seed_categories() -> Vec<(String, Vec<Question>)> {
  vec![
    (
      "Math".into(),
      vec![
        q("5 + 3 = ?", &["6", "7", "8", "9"], "8"),
        q("10 - 6 = ?", &["2", "4", "6", "8"], "4"),
        q("3 × 3 = ?", &["6", "9", "12", "15"], "9"),
        q("7 × 2 = ?", &["12", "14", "16", "18"], "14"),
        q("12 ÷ 4 = ?", &["2", "3", "4", "5"], "3"),
      ],
    ),
    (
      "Science".into(),
      vec![
        q("H2O is?", &["Water", "Oxygen", "Hydrogen", "Salt"], "Water"),
        q("Earth revolves around?", &["Moon", "Mars", "Sun", "Venus"], "Sun"),
        q("Force unit?", &["Newton", "Joule", "Watt", "Volt"], "Newton"),
        q("What planet is known as the Red Planet?", &["Earth", "Mars", "Jupiter", "Venus"], "Mars"),
        q("Which gas do plants absorb from the atmosphere?", &["Oxygen", "Carbon Dioxide", "Nitrogen", "Hydrogen"], "Carbon Dioxide"),
      ],
    ),
    (
      "General".into(),
      vec![
        q("What is the capital of France?", &["Paris", "Berlin", "Madrid", "Rome"], "Paris"),
        q("Who wrote 'Hamlet'?", &["Charles Dickens", "Leo Tolstoy", "William Shakespeare", "Mark Twain"], "William Shakespeare"),
        q("Which is the fastest land animal?", &["Leopard", "Horse", "Tiger", "Cheetah"], "Cheetah"),
        q("Which organ pumps blood through the body?", &["Lungs", "Heart", "Liver", "Kidney"], "Heart"),
        q("What is the largest sea animal?", &["Shark", "Octopus", "Whale", "Dolphin"], "Whale"),
      ],
    ),
    (
      "English".into(),
      vec![
        q("What is the opposite of hot?", &["Warm", "Cold", "Boiling", "Mild"], "Cold"),
        q("Which word is a noun?", &["Run", "Apple", "Quickly", "Blue"], "Apple"),
        q("What is the plural of child?", &["Childs", "Childes", "Children", "Childrens"], "Children"),
        q("What is the opposite of fast?", &["Slow", "Quick", "Rapid", "Swift"], "Slow"),
      ],
    ),
  ]
}

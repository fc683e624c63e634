use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} {bytes_per_sec} ({eta})";
const SPINNER_TEMPLATE: &str = "{msg} [{elapsed_precise}] {bytes} {bytes_per_sec}";
const PROGRESS_LABEL_MAX: usize = 30;

/// Byte progress bar; a spinner when the server did not announce a length.
pub(crate) fn create_progress_bar(total: Option<u64>, label: &str) -> ProgressBar {
    let (bar, template) = match total {
        Some(total) => (ProgressBar::new(total), PROGRESS_TEMPLATE),
        None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style);
    }
    bar.set_message(shorten_label(label));
    bar
}

fn shorten_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() > PROGRESS_LABEL_MAX {
        let tail: String = chars[chars.len() - PROGRESS_LABEL_MAX..].iter().collect();
        format!("..{tail}")
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::shorten_label;

    #[test]
    fn long_labels_keep_their_tail() {
        let label = "facebook/dinov2-giant/model.safetensors";
        let short = shorten_label(label);
        assert!(short.starts_with(".."));
        assert!(short.ends_with("model.safetensors"));
        assert_eq!(short.chars().count(), 32);
        assert_eq!(shorten_label("config.json"), "config.json");
    }
}

use crate::words::BBox;

use super::RecognizedWord;

const WORD_LEVEL: i32 = 5;

/// Reads word rows (level 5) from tesseract TSV output. Rows with a negative
/// confidence or blank text are skipped.
pub fn parse_tsv_words(tsv: &str) -> Vec<RecognizedWord> {
    let mut words = Vec::new();
    for row in tsv.lines().skip(1) {
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }
        let left: u32 = cols[6].parse().unwrap_or(0);
        let top: u32 = cols[7].parse().unwrap_or(0);
        let width: u32 = cols[8].parse().unwrap_or(0);
        let height: u32 = cols[9].parse().unwrap_or(0);
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        words.push(RecognizedWord {
            text: text.to_string(),
            confidence: conf.min(100.0),
            bbox: BBox::new(
                left,
                top,
                left.saturating_add(width),
                top.saturating_add(height),
            ),
        });
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t200\t50\t-1\t
4\t1\t1\t1\t1\t0\t10\t10\t110\t20\t-1\t
5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t96.5\tHello
5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t88\tWorld
5\t1\t1\t1\t1\t3\t130\t10\t5\t20\t-1\t
";

    #[test]
    fn reads_only_word_rows() {
        let words = parse_tsv_words(TSV);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[0].bbox, BBox::new(10, 10, 60, 30));
        assert_eq!(words[1].confidence, 88.0);
    }

    #[test]
    fn oversized_extents_saturate() {
        let tsv = "header\n5\t1\t1\t1\t1\t1\t4294967290\t7\t100\t4294967295\t50\tedge\n";
        let words = parse_tsv_words(tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].bbox, BBox::new(4294967290, 7, u32::MAX, u32::MAX));
    }

    #[test]
    fn tolerates_short_rows() {
        assert!(parse_tsv_words("header\n5\t1\t1\n").is_empty());
    }
}

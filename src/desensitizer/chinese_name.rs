//! Chinese personal name desensitizer
//!
//! Names cannot be found reliably in free prose, so only two shapes are
//! masked: a whole input that is a name, and a name following a label such
//! as `姓名:` or `联系人`.

use super::{Desensitizer, DesensitizerCore, DesensitizerOptions, TypeAware};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::text::mask::mask_chinese_name;
use crate::text::validate::is_chinese_name;
use crate::text::{apply_edits, Edit};
use regex::Regex;
use std::sync::OnceLock;

const SUPPORTED_TYPES: &[&str] = &["chinese_name", "name"];

/// Words that commonly follow a labelled name and are not part of it.
const STOP_WORDS: &[&str] = &[
    "电话", "手机", "邮箱", "地址", "身份证", "性别", "年龄", "先生", "女士", "的", "是", "和", "与",
];

static LABELLED_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn labelled_name_pattern() -> Option<&'static Regex> {
    crate::text::compiled(
        &LABELLED_NAME,
        r"(?:真实姓名|姓名|名字|联系人|收件人|收货人|寄件人|持卡人|开户人|户主|(?i:name))\s*[:：=]?\s*(?P<value>[\p{Han}·]{2,6})",
    )
}

/// Masks Chinese names: `张三` to `张*`, `张三丰` to `张*丰`.
#[derive(Debug)]
pub struct ChineseNameDesensitizer {
    core: DesensitizerCore,
}

impl ChineseNameDesensitizer {
    pub fn new() -> Self {
        Self {
            core: DesensitizerCore::new("chinese_name"),
        }
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let mask = self.core.settings().mask_char;

        let trimmed = text.trim();
        if is_chinese_name(trimmed) {
            let start = text.len() - text.trim_start().len();
            return Ok(apply_edits(
                text,
                vec![Edit {
                    range: start..start + trimmed.len(),
                    with: mask_chinese_name(trimmed, mask),
                }],
            ));
        }

        let Some(re) = labelled_name_pattern() else {
            return Ok(text.to_string());
        };
        let mut edits = Vec::new();
        for caps in re.captures_iter(text) {
            let Some(value) = caps.name("value") else {
                continue;
            };
            let name = cut_at_stop_word(value.as_str());
            if !is_chinese_name(name) {
                continue;
            }
            edits.push(Edit {
                range: value.start()..value.start() + name.len(),
                with: mask_chinese_name(name, mask),
            });
        }
        Ok(apply_edits(text, edits))
    }
}

impl Default for ChineseNameDesensitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate `candidate` before the first stop word after the surname.
fn cut_at_stop_word(candidate: &str) -> &str {
    let skip = candidate.chars().next().map_or(0, char::len_utf8);
    let end = STOP_WORDS
        .iter()
        .filter_map(|w| candidate[skip..].find(w).map(|i| i + skip))
        .min()
        .unwrap_or(candidate.len());
    &candidate[..end]
}

impl Desensitizer for ChineseNameDesensitizer {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn supports(&self, kind: &str) -> bool {
        SUPPORTED_TYPES.contains(&kind)
    }

    fn desensitize(&self, text: &str) -> Result<String> {
        self.core.cached(text, |t| self.mask_text(t))
    }

    fn configure(&self, options: &DesensitizerOptions) -> Result<()> {
        self.core.apply_common_options(options)
    }

    fn enable(&self) {
        self.core.enable();
    }

    fn disable(&self) {
        self.core.disable();
    }

    fn is_enabled(&self) -> bool {
        self.core.is_enabled()
    }

    fn clear_cache(&self) {
        self.core.clear_cache();
    }

    fn cache_stats(&self) -> CacheStats {
        self.core.cache_stats()
    }

    fn as_type_aware(&self) -> Option<&dyn TypeAware> {
        Some(self)
    }
}

impl TypeAware for ChineseNameDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        SUPPORTED_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        self.supports(kind) && is_chinese_name(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_input_name() {
        let d = ChineseNameDesensitizer::new();
        assert_eq!(d.desensitize("张三").unwrap(), "张*");
        assert_eq!(d.desensitize(" 张三丰 ").unwrap(), " 张*丰 ");
        assert_eq!(d.desensitize("欧阳娜娜").unwrap(), "欧**娜");
    }

    #[test]
    fn test_labelled_name() {
        let d = ChineseNameDesensitizer::new();
        assert_eq!(
            d.desensitize("联系人：王小明，电话待补").unwrap(),
            "联系人：王*明，电话待补"
        );
        assert_eq!(d.desensitize("name: 李四").unwrap(), "name: 李*");
    }

    #[test]
    fn test_stop_word_truncation() {
        let d = ChineseNameDesensitizer::new();
        assert_eq!(
            d.desensitize("姓名张三电话13812345678").unwrap(),
            "姓名张*电话13812345678"
        );
    }

    #[test]
    fn test_prose_untouched() {
        let d = ChineseNameDesensitizer::new();
        for text in ["今天天气很好", "王者荣耀真好玩啊", "hello"] {
            assert_eq!(d.desensitize(text).unwrap(), text);
        }
    }

    #[test]
    fn test_idempotent() {
        let d = ChineseNameDesensitizer::new();
        let once = d.desensitize("收件人: 赵六").unwrap();
        assert_eq!(once, "收件人: 赵*");
        assert_eq!(d.desensitize(&once).unwrap(), once);
    }

    #[test]
    fn test_type_awareness() {
        let d = ChineseNameDesensitizer::new();
        let aware = d.as_type_aware().unwrap();
        assert!(aware.validate_type("张三", "chinese_name"));
        assert!(aware.validate_type("张三", "name"));
        assert!(!aware.validate_type("张三在这里", "name"));
    }
}

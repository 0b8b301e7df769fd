use docrag_core::config::TokenizerConfig;
use docrag_core::error::{Error, Result};
use docrag_core::traits::TokenCounter;
use docrag_core::types::{Chunk, SplitterConf};
use docrag_embed::{HeuristicTokenCounter, HfTokenCounter};
use docrag_split::cut::refine;
use docrag_split::segment::segment;
use docrag_split::{find_best_split, normalize, ScoreWeights, Splitter};

struct BrokenCounter;

impl TokenCounter for BrokenCounter {
    fn count_tokens(&self, _text: &str) -> Result<usize> {
        Err(Error::TokenizerUnavailable("model not loaded".into()))
    }
}

const SAMPLE: &str = "# 介绍
这是一个关于Java的介绍。
commonmark-java是一个很有用的库。
aa![A mushroom-head robot drinking bubble tea](https://raw.githubusercontent.com/Codecademy/docs/main/media/codey.jpg)bb

## 核心功能
- **解析**: 将Markdown文本转换为AST。
- **渲染**: 将AST转换为HTML或其他格式。

代码示例：
```java
Parser parser = Parser.builder().build();
Node document = parser.parse(markdownText);
```

# 安装指南
## Maven
请在pom.xml中添加依赖。

## Gradle
请在build.gradle中添加依赖。";

const CODE_FENCE: &str = "```java\nParser parser = Parser.builder().build();\nNode document = parser.parse(markdownText);\n```\n";

fn splitter(conf: SplitterConf) -> Splitter<HeuristicTokenCounter> {
    Splitter::new(HeuristicTokenCounter, conf).expect("valid conf")
}

fn tokens(chunks: &[Chunk]) -> Vec<usize> {
    chunks.iter().map(|c| c.tokens).collect()
}

#[test]
fn segments_follow_top_level_headings() {
    let segments = segment(SAMPLE, "title", &HeuristicTokenCounter).unwrap();
    let heads: Vec<(&str, u8)> = segments.iter().map(|s| (s.header.as_str(), s.level)).collect();
    assert_eq!(
        heads,
        vec![("title", 0), ("介绍", 1), ("核心功能", 2), ("安装指南", 1), ("Maven", 2), ("Gradle", 2)]
    );
    assert_eq!(segments[0].body, "");
    assert_eq!(segments[1].body, "这是一个关于Java的介绍。\ncommonmark-java是一个很有用的库。\naabb\n");
    assert!(segments[2].body.ends_with(CODE_FENCE));
    assert!(segments[2].body.contains("格式。\n\n代码示例：\n\n```java"));
    assert_eq!(segments[3].body, "");
    assert_eq!(segments[5].body.trim(), "请在build.gradle中添加依赖。");
    assert_eq!((segments[1].header_tokens, segments[1].body_tokens), (2, 24));
    assert_eq!((segments[2].header_tokens, segments[2].body_tokens), (4, 72));
}

#[test]
fn headings_and_code_fence_group_into_three_chunks() {
    let chunks = splitter(SplitterConf::new(80, 20, 20, 30)).split_markdown(SAMPLE, "commonmark").unwrap();
    assert_eq!(tokens(&chunks), vec![27, 76, 28]);
    assert_eq!(chunks[0].markdown, "# 介绍\n这是一个关于Java的介绍。\ncommonmark-java是一个很有用的库。\naabb\n");
    assert!(chunks[1].markdown.starts_with("## 核心功能\n- **解析**"));
    assert!(chunks[1].markdown.ends_with(CODE_FENCE));
    assert_eq!(
        chunks[2].markdown,
        "# 安装指南\n## Maven\n请在pom.xml中添加依赖。\n## Gradle\n请在build.gradle中添加依赖。\n"
    );
    for chunk in &chunks {
        assert!(!chunk.markdown.contains("]("), "link survived in {:?}", chunk.markdown);
        assert!(!chunk.markdown.contains("codey.jpg"));
    }
}

#[test]
fn oversize_section_is_cut_and_reprefixed() {
    let chunks = splitter(SplitterConf::new(40, 20, 20, 30)).split_markdown(SAMPLE, "commonmark").unwrap();
    assert_eq!(tokens(&chunks), vec![27, 21, 24, 30, 21, 24]);
    let pieces: Vec<&Chunk> = chunks.iter().filter(|c| c.markdown.starts_with("## 核心功能\n")).collect();
    assert_eq!(pieces.len(), 4);
    assert_eq!(chunks[1].markdown, "## 核心功能\n- **解析**: 将Markdown文本转换为AST。");
    // Blank lines are dropped by the line packer, code fences included.
    assert!(chunks[3].markdown.starts_with("## 核心功能\n代码示例：\n```java"));
}

#[test]
fn refined_segments_respect_the_trigger() {
    let conf = SplitterConf::new(40, 20, 20, 30);
    let segments = segment(SAMPLE, "commonmark", &HeuristicTokenCounter).unwrap();
    let refined = refine(&segments, &conf, &ScoreWeights::default(), &HeuristicTokenCounter).unwrap();
    assert!(refined.len() > segments.len());
    assert!(refined.iter().all(|s| s.body_tokens <= conf.segment_trigger_split_length));

    let chunks = splitter(conf).split_segments(&segments).unwrap();
    let refined_total: usize = refined.iter().map(|s| s.tokens()).sum();
    assert_eq!(chunks.iter().map(|c| c.tokens).sum::<usize>(), refined_total);
}

#[test]
fn nothing_oversize_returns_the_same_segments() {
    let conf = SplitterConf::default();
    let segments = segment(SAMPLE, "commonmark", &HeuristicTokenCounter).unwrap();
    let refined = refine(&segments, &conf, &ScoreWeights::default(), &HeuristicTokenCounter).unwrap();
    assert!(matches!(refined, std::borrow::Cow::Borrowed(_)));
}

#[test]
fn small_document_is_a_single_chunk() {
    let chunks = splitter(SplitterConf::default()).split_markdown(SAMPLE, "commonmark").unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].tokens, 131);
    assert!(chunks[0].markdown.starts_with("# 介绍\n"));
}

#[test]
fn best_split_prefers_balanced_chunks() {
    let tokens = [100, 100, 200, 200];
    let levels = [0, 1, 2, 2];
    let w = ScoreWeights::default();
    assert_eq!(find_best_split(&tokens, &levels, 100, 120, &w), vec![1, 2, 3]);
    assert_eq!(find_best_split(&tokens, &levels, 180, 220, &w), vec![2, 3]);
    assert_eq!(find_best_split(&tokens, &levels, 200, 400, &w), vec![2]);
}

#[test]
fn heavier_level_weight_moves_boundaries_to_top_headings() {
    let tokens = [10, 10, 10, 10];
    let levels = [1, 2, 1, 2];
    let points = find_best_split(&tokens, &levels, 15, 25, &ScoreWeights { level: 50.0, ..ScoreWeights::default() });
    assert_eq!(points, vec![2]);
}

#[test]
fn heading_only_document() {
    let segments = segment("# A\n# B\n", "T", &HeuristicTokenCounter).unwrap();
    let heads: Vec<(&str, u8)> = segments.iter().map(|s| (s.header.as_str(), s.level)).collect();
    assert_eq!(heads, vec![("T", 0), ("A", 1), ("B", 1)]);

    let chunks = splitter(SplitterConf::default()).split_markdown("# A\n# B\n", "T").unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].markdown, "# A\n# B\n");
    assert_eq!(chunks[0].tokens, 3);
}

#[test]
fn empty_document_is_one_empty_chunk() {
    let chunks = splitter(SplitterConf::default()).split_markdown("", "Title").unwrap();
    assert_eq!(chunks, vec![Chunk { markdown: String::new(), tokens: 1 }]);
}

#[test]
fn document_without_headings_keeps_whole_body() {
    let segments = segment("one\n\ntwo\n", "T", &HeuristicTokenCounter).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].body, "one\n\ntwo\n");
}

#[test]
fn links_images_and_definitions_are_removed() {
    let md = "Read [the guide](https://e.com/guide) and <https://e.com>.\n\n\
              ![pic](a.png) caption [ref]\n\n[ref]: https://e.com/ref\n\n\
              > quote ![x](data:image/png;base64,iVBORw0KGgo=) end\n";
    let out = normalize(md);
    assert!(!out.contains("]("));
    assert!(!out.contains("https://"));
    assert!(!out.contains("data:image"));
    assert!(out.contains("> quote  end"));
    assert!(out.contains("caption"));
}

#[test]
fn normalization_is_idempotent() {
    let inputs = [
        SAMPLE,
        "",
        "text [a](b)\n\n[b]: /x\n",
        "- item [x](y)\n  - nested ![i](j)\n\n1. one\n2. two\n",
        "| a | b |\n|---|---|\n| [l](m) | 2 |\n",
        "para\n***\n> quote\n>\n> more\n",
        "[[a](b)](c)\n",
        "see [[a](b)](http://e.com) and [![i](j)](k) now\n",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "input: {input:?}");
    }
}

#[test]
fn chunks_never_carry_a_link_rebuilt_from_leftover_brackets() {
    let chunks = splitter(SplitterConf::default()).split_markdown("# H\nsee [[a](b)](http://evil.example) now\n", "t").unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].markdown, "# H\nsee  now\n");
    assert!(!chunks[0].markdown.contains("evil"));
}

#[test]
fn structure_survives_normalization() {
    let md = "*em* and **strong**\n\n---\n\n1. first\n2. second\n\n```\nkeep\n\nblank\n```\n";
    assert_eq!(normalize(md), md);
}

#[test]
fn splitting_is_deterministic() {
    let s = splitter(SplitterConf::new(40, 20, 20, 30));
    let a = s.split_markdown(SAMPLE, "t").unwrap();
    let b = s.split_markdown(SAMPLE, "t").unwrap();
    assert_eq!(a, b);
}

#[test]
fn invalid_conf_is_rejected_before_work() {
    assert!(matches!(Splitter::new(HeuristicTokenCounter, SplitterConf::new(80, 20, 30, 20)), Err(Error::InvalidConfig(_))));
    assert!(matches!(Splitter::new(HeuristicTokenCounter, SplitterConf::new(80, 0, 20, 30)), Err(Error::InvalidConfig(_))));
}

#[test]
fn tokenizer_failure_propagates() {
    let s = Splitter::new(BrokenCounter, SplitterConf::default()).unwrap();
    assert!(matches!(s.split_markdown("# a\nb", "t"), Err(Error::TokenizerUnavailable(_))));
}

#[test]
fn dump_lists_tokens_and_chars() {
    let chunks = splitter(SplitterConf::new(80, 20, 20, 30)).split_markdown(SAMPLE, "commonmark").unwrap();
    let dump = Chunk::dump(&chunks);
    assert!(dump.starts_with("-----token:27 (50)-----\n# 介绍\n"));
    assert!(dump.contains("-----token:76 (171)-----\n## 核心功能\n"));
    assert!(dump.ends_with("添加依赖。\n\n"));
}

fn real_counter() -> Option<HfTokenCounter> {
    let file = std::env::var("APP_TOKENIZER_FILE").ok()?;
    Some(HfTokenCounter::from_file(std::path::Path::new(&file), &TokenizerConfig::default()).expect("tokenizer"))
}

/// Runs only when `APP_TOKENIZER_FILE` points at the DeepSeek-R1-0528 `tokenizer.json`.
#[test]
fn deepseek_counts_for_headings_and_code_fence() {
    let Some(counter) = real_counter() else { return };
    let chunks = Splitter::new(counter, SplitterConf::new(80, 20, 20, 30)).unwrap().split_markdown(SAMPLE, "commonmark").unwrap();
    assert_eq!(tokens(&chunks), vec![21, 53, 21]);
    assert!(chunks[1].markdown.ends_with(CODE_FENCE));
}

/// Runs only when `APP_TOKENIZER_FILE` points at the DeepSeek-R1-0528 `tokenizer.json`.
#[test]
fn deepseek_counts_for_oversize_section() {
    let Some(counter) = real_counter() else { return };
    let chunks = Splitter::new(counter, SplitterConf::new(40, 20, 20, 30)).unwrap().split_markdown(SAMPLE, "commonmark").unwrap();
    assert_eq!(tokens(&chunks), vec![21, 31, 27, 21]);
    assert!(chunks[1].markdown.starts_with("## 核心功能\n"));
    assert!(chunks[2].markdown.starts_with("## 核心功能\n"));
}

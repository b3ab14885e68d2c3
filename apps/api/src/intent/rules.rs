/// Question categories, declared in classification priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Greeting,
    Contact,
    Comprehensive,
    Image,
    Skill,
    Education,
    Certification,
    Experience,
    Social,
    Project,
    /// three.js / WebGL pieces.
    Threejs,
    Weakness,
    Profile,
    Hobby,
}

/// One row of the keyword table.
#[derive(Debug)]
pub struct Rule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    /// A co-occurring exclusion keyword vetoes the classification match.
    pub exclusions: &'static [&'static str],
    /// Extra phrasings that trigger retrieval but not classification.
    pub retrieval_extras: &'static [&'static str],
}

const EDUCATION_KEYWORDS: &[&str] = &[
    "학력", "학교", "졸업", "전공", "대학", "교육", "education", "school", "graduate", "major",
    "university",
];

/// Education phrasings that veto an experience match.
const EDUCATION_VETO: &[&str] = &[
    "학력", "학교", "졸업", "전공", "대학", "education", "school", "graduate", "major",
    "university",
];

const THREEJS_KEYWORDS: &[&str] = &["three.js", "threejs", "three js", "webgl", "웹gl", "3d"];

/// Keywords that ask for live GitHub data on top of the stored social links.
pub const GITHUB_HINTS: &[&str] = &[
    "깃헙", "github", "깃허브", "레포", "repo", "오픈소스", "open source", "코드", "code",
];

pub const LINKEDIN_HINTS: &[&str] = &["링크드인", "linkedin", "링크인", "이력서", "커리어"];

/// Experience phrasings that prefer the timeline component over the list.
pub const TIMELINE_HINTS: &[&str] = &["이력", "타임라인", "timeline"];

pub static RULES: [Rule; 14] = [
    Rule {
        category: Category::Greeting,
        keywords: &[
            "안녕", "하이", "hi", "hello", "반가워", "처음", "인사", "인사말", "greeting",
            "greetings",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Contact,
        keywords: &[
            "연락", "커피쳇", "커피챗", "면접제안", "컨택", "문의", "이메일", "contact",
            "inquiry", "email", "메일",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Comprehensive,
        keywords: &[
            "어떤 개발자", "어떤 사람", "종합적", "전체적", "특징", "한마디로", "요약", "정리",
        ],
        exclusions: &[],
        retrieval_extras: &["리더", "어떤 리더", "강점", "장점"],
    },
    Rule {
        category: Category::Image,
        keywords: &[
            "사진", "이미지", "갤러리", "아카이브", "앨범", "image", "gallery", "archive", "album",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Skill,
        keywords: &[
            "기술", "스택", "skill", "stack", "프레임워크", "도구", "framework", "tool",
            "라이브러리", "library", "스킬", "기여", "언어", "역량", "능력", "skillset", "고민",
            "관심",
        ],
        exclusions: &[],
        retrieval_extras: &["뭘 잘", "contribution", "language", "ability"],
    },
    Rule {
        category: Category::Education,
        keywords: EDUCATION_KEYWORDS,
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Certification,
        keywords: &[
            "인증서", "자격증", "인증", "증명서", "자격", "certificate", "certification",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Experience,
        keywords: &[
            "경력", "회사", "일", "직장", "커리어", "경험", "이직", "career", "company", "job",
            "work", "experience", "transition", "이력", "타임라인", "timeline", "어떻게 되",
        ],
        exclusions: EDUCATION_VETO,
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Social,
        keywords: &[
            "소셜", "링크", "깃헙", "github", "깃허브", "링크드인", "linkedin", "social", "link",
            "sns", "링크인", "연결", "연락처", "연락 방법",
        ],
        exclusions: &[],
        retrieval_extras: &[
            "레포", "repo", "오픈소스", "open source", "코드", "code", "이력서", "커리어",
        ],
    },
    Rule {
        category: Category::Project,
        keywords: &[
            "프로젝트", "토이프로젝트", "작업", "작품", "진행", "했던", "최근 프로젝트",
            "최근 진행", "project", "made", "portfolio", "product", "recent project",
        ],
        exclusions: &[
            "소셜", "링크", "social", "link", "sns", "깃헙", "github", "linkedin", "three.js",
            "threejs", "three js", "webgl", "웹gl", "3d",
        ],
        retrieval_extras: &["만든", "개발", "최근", "development", "recent", "tell"],
    },
    Rule {
        category: Category::Threejs,
        keywords: THREEJS_KEYWORDS,
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Weakness,
        keywords: &[
            "단점", "부족", "아쉬운", "개선", "약점", "한계", "어려움", "weakness", "improvement",
            "limitation", "challenge", "difficulty",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
    Rule {
        category: Category::Profile,
        keywords: &[
            "자기소개", "누구", "프로필", "소개", "introduce", "name", "who", "profile",
            "introduction", "철학", "가치관", "성격", "장점", "강점", "philosophy", "value",
            "personality", "strength",
        ],
        exclusions: &[],
        retrieval_extras: &["이름", "너는"],
    },
    Rule {
        category: Category::Hobby,
        keywords: &[
            "취미", "관심사", "좋아하", "여가", "취향", "hobby", "interest", "like", "leisure",
        ],
        exclusions: &[],
        retrieval_extras: &[],
    },
];

/// Case-insensitive containment of any keyword. `text` must already be lower-cased.
pub fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

impl Rule {
    /// Classification match: a keyword hit that no exclusion vetoes.
    pub fn matches(&self, query: &str) -> bool {
        matches_any(query, self.keywords) && !matches_any(query, self.exclusions)
    }

    /// Retrieval match: keywords or retrieval extras, exclusions ignored.
    pub fn matches_for_retrieval(&self, query: &str) -> bool {
        matches_any(query, self.keywords) || matches_any(query, self.retrieval_extras)
    }
}

/// First category, in priority order, whose rule matches the lower-cased query.
pub fn detect_category(query: &str) -> Option<Category> {
    RULES.iter().find(|r| r.matches(query)).map(|r| r.category)
}

/// Every category the retriever should fetch for, in table order.
pub fn retrieval_categories(query: &str) -> Vec<Category> {
    RULES
        .iter()
        .filter(|r| r.matches_for_retrieval(query))
        .map(|r| r.category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_for(category: Category) -> &'static Rule {
        RULES.iter().find(|r| r.category == category).unwrap()
    }

    #[test]
    fn test_table_order_is_priority_order() {
        let order: Vec<Category> = RULES.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                Category::Greeting,
                Category::Contact,
                Category::Comprehensive,
                Category::Image,
                Category::Skill,
                Category::Education,
                Category::Certification,
                Category::Experience,
                Category::Social,
                Category::Project,
                Category::Threejs,
                Category::Weakness,
                Category::Profile,
                Category::Hobby,
            ]
        );
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for rule in &RULES {
            for kw in rule
                .keywords
                .iter()
                .chain(rule.exclusions)
                .chain(rule.retrieval_extras)
            {
                assert_eq!(*kw, kw.to_lowercase(), "{:?}: {kw}", rule.category);
            }
        }
    }

    #[test]
    fn test_experience_vetoed_by_education() {
        let rule = rule_for(Category::Experience);
        assert!(rule.matches("최근 경력이 궁금해요"));
        assert!(!rule.matches("경력이랑 학력"));
        // Retrieval still fetches experience for the same query.
        assert!(rule.matches_for_retrieval("경력이랑 학력"));
    }

    #[test]
    fn test_project_vetoed_by_social_and_threejs() {
        let rule = rule_for(Category::Project);
        assert!(rule.matches("최근 프로젝트 알려줘"));
        assert!(!rule.matches("프로젝트 github 링크"));
        assert!(!rule.matches("webgl 작업물"));
    }

    #[test]
    fn test_retrieval_superset_includes_extras() {
        assert_eq!(detect_category("repo"), None);
        assert!(retrieval_categories("repo").contains(&Category::Social));
        assert!(retrieval_categories("강점이 뭐예요").contains(&Category::Comprehensive));
    }

    #[test]
    fn test_hi_matches_inside_words() {
        // Plain substring containment: "which" and "history" contain "hi".
        let query = "which projects did you build?";
        assert_eq!(detect_category(query), Some(Category::Greeting));
        let fetched = retrieval_categories(query);
        assert!(fetched.contains(&Category::Greeting));
        assert!(fetched.contains(&Category::Project));
        assert_eq!(detect_category("tell me your history"), Some(Category::Greeting));
    }

    #[test]
    fn test_no_category_for_unrelated_query() {
        assert_eq!(detect_category("오늘 날씨"), None);
    }
}

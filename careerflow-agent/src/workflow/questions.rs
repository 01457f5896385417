//! Fixed career assessment question bank.

pub const QUESTION_COUNT: usize = 15;

pub const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

/// One multiple-choice question with options labelled A–D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentQuestion {
    pub question: &'static str,
    pub options: [&'static str; 4],
}

pub static QUESTION_BANK: [AssessmentQuestion; QUESTION_COUNT] = [
    AssessmentQuestion {
        question: "在团队项目中，你最常扮演的角色是？",
        options: [
            "组织协调，推动大家按计划前进",
            "钻研技术难点，负责核心实现",
            "提出创意和新点子",
            "对接外部资源，负责沟通和展示",
        ],
    },
    AssessmentQuestion {
        question: "你更喜欢哪种工作节奏？",
        options: [
            "稳定有序，按部就班",
            "快节奏，充满挑战",
            "自由灵活，自己安排时间",
            "项目制，阶段性冲刺",
        ],
    },
    AssessmentQuestion {
        question: "面对一个全新的问题，你通常会？",
        options: [
            "先收集数据再分析",
            "直接动手尝试",
            "找有经验的人请教",
            "先思考整体框架再拆解",
        ],
    },
    AssessmentQuestion {
        question: "以下哪类任务最能让你投入？",
        options: [
            "与人交流、说服他人",
            "写代码或搭建系统",
            "设计视觉或内容作品",
            "梳理流程、制定规范",
        ],
    },
    AssessmentQuestion {
        question: "你最看重工作的哪一点？",
        options: [
            "收入和晋升空间",
            "个人成长和学习机会",
            "工作与生活的平衡",
            "工作的社会意义",
        ],
    },
    AssessmentQuestion {
        question: "你更愿意在哪种规模的组织中工作？",
        options: [
            "大型企业或机构",
            "成长期的中型公司",
            "初创团队",
            "自由职业或自己创业",
        ],
    },
    AssessmentQuestion {
        question: "朋友遇到困难时，通常会因为什么来找你？",
        options: [
            "你善于倾听和安慰",
            "你能给出理性的分析",
            "你点子多、办法多",
            "你人脉广、能帮忙牵线",
        ],
    },
    AssessmentQuestion {
        question: "你对数字和数据的态度是？",
        options: [
            "很感兴趣，喜欢从数据中找规律",
            "能处理，但不是最爱",
            "不太擅长，尽量回避",
            "只关心数据背后的故事和结论",
        ],
    },
    AssessmentQuestion {
        question: "你更喜欢哪种沟通方式？",
        options: [
            "当面沟通",
            "书面文档",
            "会议讨论",
            "一对一即时消息",
        ],
    },
    AssessmentQuestion {
        question: "在压力很大的时候，你通常会？",
        options: [
            "列清单，逐项解决",
            "找人倾诉，寻求支持",
            "暂时抽离，调整后再回来",
            "越有压力越兴奋，全力冲刺",
        ],
    },
    AssessmentQuestion {
        question: "你希望自己的工作成果主要体现为？",
        options: [
            "可量化的业绩指标",
            "稳定运行的产品或系统",
            "有影响力的作品或内容",
            "他人的成长与改变",
        ],
    },
    AssessmentQuestion {
        question: "学习新技能时，你偏好的方式是？",
        options: [
            "系统学习课程或书籍",
            "边做边学，在实践中摸索",
            "跟着导师或前辈学",
            "和同伴一起讨论学习",
        ],
    },
    AssessmentQuestion {
        question: "你对出差或经常变换工作地点的态度是？",
        options: [
            "非常喜欢，乐于探索",
            "可以接受偶尔出差",
            "尽量避免",
            "希望远程办公",
        ],
    },
    AssessmentQuestion {
        question: "做决定时，你更依赖？",
        options: [
            "逻辑和事实",
            "直觉和感受",
            "他人的意见",
            "过往的经验",
        ],
    },
    AssessmentQuestion {
        question: "五年后，你最希望自己成为？",
        options: [
            "某个领域的技术专家",
            "带领团队的管理者",
            "有个人品牌的创作者",
            "拥有自己事业的创业者",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_shape() {
        assert_eq!(QUESTION_BANK.len(), QUESTION_COUNT);
        for question in &QUESTION_BANK {
            assert!(!question.question.is_empty());
            assert!(question.options.iter().all(|option| !option.is_empty()));
        }
    }
}

use proptest::{
    prelude::{any, prop, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy},
    prop_compose,
};
use smol_str::SmolStr;

use crate::{ComplexType, ParamKind, UniqueType};

#[derive(Debug, Clone, Copy)]
pub struct RecursiveParams {
    pub depth: u32,
    pub desired_size: u32,
    pub expected_branch_size: u32,
}

impl Default for RecursiveParams {
    fn default() -> Self {
        Self {
            depth: 3,
            desired_size: 32,
            expected_branch_size: 3,
        }
    }
}

prop_compose! {
    pub fn arb_const_name()(
        segments in prop::collection::vec("[A-Z][a-z]{0,6}", 1..3)
    ) -> SmolStr {
        segments.join("::").into()
    }
}

pub fn arb_leaf() -> impl Strategy<Value = UniqueType> {
    prop_oneof![
        4 => (arb_const_name(), any::<bool>())
            .prop_map(|(name, rooted)| UniqueType::new(name, rooted, vec![], vec![], ParamKind::None)),
        1 => prop_oneof![Just("nil"), Just("undefined"), Just("self"), Just("Boolean")]
            .prop_map(UniqueType::named),
        1 => "#[a-z]{1,6}\\??".prop_map(UniqueType::named),
    ]
}

fn arb_unique(args: RecursiveParams) -> impl Strategy<Value = UniqueType> {
    arb_leaf().prop_recursive(
        args.depth,
        args.desired_size,
        args.expected_branch_size,
        |inner| {
            let param = inner.prop_map(ComplexType::from);
            let params = prop::collection::vec(param.clone(), 1..3);
            prop_oneof![
                (arb_const_name(), any::<bool>(), params.clone()).prop_map(
                    |(name, rooted, subs)| UniqueType::new(name, rooted, vec![], subs, ParamKind::List)
                ),
                (arb_const_name(), any::<bool>(), params.clone()).prop_map(
                    |(name, rooted, subs)| UniqueType::new(name, rooted, vec![], subs, ParamKind::Fixed)
                ),
                (arb_const_name(), any::<bool>(), params.clone(), params).prop_map(
                    |(name, rooted, keys, values)| {
                        UniqueType::new(name, rooted, keys, values, ParamKind::Hash)
                    }
                ),
            ]
        },
    )
}

impl Arbitrary for UniqueType {
    type Parameters = RecursiveParams;
    type Strategy = BoxedStrategy<UniqueType>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        arb_unique(args).boxed()
    }
}

impl Arbitrary for ComplexType {
    type Parameters = RecursiveParams;
    type Strategy = BoxedStrategy<ComplexType>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(arb_unique(args), 1..4)
            .prop_map(ComplexType::new)
            .boxed()
    }
}

use super::print_json;
use crate::cli::args::LookupArgs;
use udstore_core::MembershipStore;

pub fn run(store: &MembershipStore, args: LookupArgs) -> anyhow::Result<i32> {
    if let Some(principal_namespace) = &args.principals {
        let principals = store.group_principals_for_search_user_and_groups(
            principal_namespace,
            &args.groups,
            &args.user,
        )?;
        return print_json(&principals);
    }

    let memberships = if args.groups.is_empty() {
        store.get_all_memberships_for_user(&args.user)?
    } else {
        store.get_all_memberships_for_search_user_and_groups(&args.user, &args.groups)?
    };
    print_json(&memberships)
}
